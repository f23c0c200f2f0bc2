// src/relatorio_handlers.rs

//! # Handlers do Relatório de Visitas

use crate::auth::{self, AppState};
use crate::relatorio::{self, FiltroRelatorio};
use crate::{db, relatorio_pdf};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{
    debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::Local;
use tower_cookies::Cookies;

#[debug_handler]
pub async fn relatorio_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filtro): Query<FiltroRelatorio>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match relatorio::montar(&conn, filtro).await {
        Ok(linhas) => Json(linhas).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn relatorio_pdf_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filtro): Query<FiltroRelatorio>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    let linhas = match relatorio::montar(&conn, filtro).await {
        Ok(linhas) => linhas,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };

    match relatorio_pdf::gerar_pdf_do_relatorio(&linhas) {
        Ok(pdf_bytes) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, "application/pdf".parse().unwrap());
            headers.insert(
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"relatorio_visitas_{}.pdf\"",
                    Local::now().format("%Y-%m-%d")
                )
                .parse()
                .unwrap(),
            );
            (headers, pdf_bytes).into_response()
        }
        Err(e) => {
            eprintln!("Erro ao gerar PDF: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Erro ao gerar o PDF.").into_response()
        }
    }
}
