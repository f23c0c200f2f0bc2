// src/doentes_handlers.rs

//! # Handlers de Doentes
//!
//! Qualquer ministro autenticado regista e edita doentes; a remoção, que
//! arrasta os telefones dependentes, é reservada ao administrador.

use crate::auth::{self, AppState};
use crate::{db, doentes};
use axum::http::StatusCode;
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use tower_cookies::Cookies;

#[debug_handler]
pub async fn listar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filtro): Query<doentes::FiltroDoentes>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match doentes::listar(&conn, filtro).await {
        Ok(lista) => Json(lista).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn buscar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match doentes::buscar(&conn, &id).await {
        Ok(Some(doente)) => Json(doente).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Doente não encontrado.").into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn criar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(novo): Json<doentes::NovoDoente>,
) -> impl IntoResponse {
    let sessao = match auth::exigir_sessao(&state, &cookies) {
        Ok(s) => s,
        Err(r) => return r,
    };
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match doentes::criar(&conn, novo, &sessao.ministro.id).await {
        Ok(doente) => (StatusCode::CREATED, Json(doente)).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn atualizar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
    Json(dados): Json<doentes::NovoDoente>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match doentes::atualizar(&conn, &id, dados).await {
        Ok(doente) => Json(doente).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn apagar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_admin(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match doentes::apagar(&conn, &id).await {
        Ok(()) => (StatusCode::OK, "Doente removido.").into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}
