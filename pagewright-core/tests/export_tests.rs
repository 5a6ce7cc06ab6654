//! Export tests: every format renders the same paginated document

use pagewright_core::encoder::{encoder_for_format, export, ExportFormat};
use pagewright_core::error::ExportError;
use pagewright_core::layout::assemble;
use pagewright_core::types::{Book, Chapter, ImageBlob};
use std::io::Read;

fn sample_book() -> Book {
    let image = ImageBlob::new("image/png", b"\x89PNG\r\n\x1a\nfake".to_vec());
    Book::new("Export Sample")
        .with_author("A. Writer")
        .with_publisher("Small Press")
        .with_cover_image(Some(image.clone()))
        .with_chapter(Chapter::new("Opening").with_content(format!(
            "It was a **dark** and *stormy* night.\n![the storm]({})\n[[PAGEBREAK]]\nMorning came.",
            image.to_data_uri()
        )))
        .with_chapter(Chapter::new("Closing").with_content("The end."))
}

#[test]
fn test_every_format_exports() {
    let doc = assemble(&sample_book());
    for format in ExportFormat::ALL {
        let bytes = export(&doc, format).unwrap_or_else(|e| panic!("{} failed: {}", format, e));
        assert!(!bytes.is_empty(), "{} produced no output", format);
    }
}

#[test]
fn test_page_counts_agree_across_formats() {
    let doc = assemble(&sample_book());
    let pages = doc.page_count();

    let html = String::from_utf8(export(&doc, ExportFormat::Html).unwrap()).unwrap();
    assert_eq!(html.matches("<section class=\"page").count(), pages);

    let txt = String::from_utf8(export(&doc, ExportFormat::Txt).unwrap()).unwrap();
    assert_eq!(txt.split('\u{000C}').count(), pages);

    let pdf = export(&doc, ExportFormat::Pdf).unwrap();
    let pdf = String::from_utf8_lossy(&pdf);
    assert!(pdf.contains(&format!("/Count {}", pages)));

    let docx = export(&doc, ExportFormat::Docx).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(docx)).unwrap();
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert_eq!(document.matches("w:type=\"page\"").count(), pages - 1);
}

#[test]
fn test_failure_in_one_format_leaves_others_working() {
    let book = sample_book().with_chapter(Chapter::new("Unicode").with_content("日本語のテキスト"));
    let doc = assemble(&book);

    assert!(matches!(
        export(&doc, ExportFormat::Pdf),
        Err(ExportError::UnsupportedFeature(_))
    ));
    for format in [ExportFormat::Html, ExportFormat::Txt, ExportFormat::Docx] {
        assert!(export(&doc, format).is_ok(), "{} should still export", format);
    }
}

#[test]
fn test_typographic_punctuation_exports_everywhere() {
    let book = sample_book().with_chapter(
        Chapter::new("Quotes").with_content("It\u{2019}s a \u{201C}test\u{201D} \u{2014} really\u{2026}"),
    );
    let doc = assemble(&book);
    for format in ExportFormat::ALL {
        assert!(export(&doc, format).is_ok(), "{} should export curly quotes", format);
    }
}

#[test]
fn test_control_characters_stay_out_of_docx() {
    let book = sample_book().with_chapter(Chapter::new("Feed").with_content("page\u{000C}feed\u{0007}"));
    let docx = export(&assemble(&book), ExportFormat::Docx).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(docx)).unwrap();
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();

    assert!(!document.contains('\u{000C}'));
    assert!(!document.contains('\u{0007}'));
    assert!(document.contains("page feed"));
}

#[test]
fn test_missing_title_fails_before_encoding() {
    let doc = assemble(&sample_book().with_title(""));
    assert!(matches!(
        export(&doc, ExportFormat::Html),
        Err(ExportError::MissingField(field)) if field == "title"
    ));
}

#[test]
fn test_encoder_writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let doc = assemble(&sample_book());

    let encoder = encoder_for_format("txt").unwrap();
    let mut file = std::fs::File::create(&path).unwrap();
    encoder.encode(&doc, &mut file).unwrap();
    drop(file);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("It was a dark and stormy night."));
    assert!(text.contains("[Image: the storm]"));
}
