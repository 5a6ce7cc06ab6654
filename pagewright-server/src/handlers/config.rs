//! Configuration handlers

use super::ApiResult;
use crate::state::{AppState, ServerEvent};
use axum::{extract::State, http::StatusCode, Json};
use pagewright_core::{ConfigError, Configuration};

fn config_error(e: ConfigError) -> (StatusCode, String) {
    match e {
        ConfigError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        _ => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// Lay every open draft out again with `config`
async fn apply_to_drafts(state: &AppState, config: &Configuration) {
    let updated: Vec<_> = {
        let mut drafts = state.drafts.write().await;
        drafts
            .iter_mut()
            .map(|(id, session)| {
                let ticket = session.update(|book| book.with_config(config.clone()));
                (*id, session.book().title.clone(), ticket.generation())
            })
            .collect()
    };

    for (id, title, generation) in updated {
        state.broadcast(ServerEvent::DraftUpdated {
            id,
            title,
            generation,
        });
        state.schedule_render(id);
    }
}

/// Current persisted configuration
pub async fn get_config(State(state): State<AppState>) -> Json<Configuration> {
    Json(state.configuration().await)
}

/// Validate and persist a new configuration
pub async fn put_config(
    State(state): State<AppState>,
    Json(config): Json<Configuration>,
) -> ApiResult<Json<Configuration>> {
    {
        let mut settings = state.settings.write().await;
        config.persist(&mut **settings).map_err(config_error)?;
    }
    tracing::info!("Configuration updated");

    apply_to_drafts(&state, &config).await;
    Ok(Json(config))
}

/// Restore the default configuration
pub async fn reset_config(State(state): State<AppState>) -> ApiResult<Json<Configuration>> {
    {
        let mut settings = state.settings.write().await;
        Configuration::reset(&mut **settings).map_err(config_error)?;
    }
    tracing::info!("Configuration reset to defaults");

    let config = state.configuration().await;
    apply_to_drafts(&state, &config).await;
    Ok(Json(config))
}
