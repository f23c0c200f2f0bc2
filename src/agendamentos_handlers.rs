// src/agendamentos_handlers.rs

//! # Handlers de Agendamentos
//!
//! O agendamento explícito (com data e hora escolhidas) e a remoção são
//! ações de administrador. Assumir uma visita, juntar-se como acompanhante
//! e concluir ou cancelar estão ao alcance de qualquer ministro com sessão.

use crate::auth::{self, AppState};
use crate::{agendamentos, db};
use axum::http::StatusCode;
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tower_cookies::Cookies;

#[derive(Debug, Deserialize)]
pub struct AssumirForm {
    pub doente_id: String,
}

#[debug_handler]
pub async fn listar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filtro): Query<agendamentos::FiltroAgendamentos>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match agendamentos::listar(&conn, filtro).await {
        Ok(lista) => Json(lista).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

/// Agendamento explícito, com data e hora escolhidas pelo administrador.
#[debug_handler]
pub async fn criar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(novo): Json<agendamentos::NovoAgendamento>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_admin(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match agendamentos::criar(&conn, novo).await {
        Ok(agendamento) => (StatusCode::CREATED, Json(agendamento)).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

/// O ministro com sessão assume já a visita ao doente.
#[debug_handler]
pub async fn assumir_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<AssumirForm>,
) -> impl IntoResponse {
    let sessao = match auth::exigir_sessao(&state, &cookies) {
        Ok(s) => s,
        Err(r) => return r,
    };
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match agendamentos::assumir_agora(&conn, &form.doente_id, &sessao.ministro.id).await {
        Ok(agendamento) => (StatusCode::CREATED, Json(agendamento)).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

/// O ministro com sessão ocupa a vaga de acompanhante da visita.
#[debug_handler]
pub async fn juntar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let sessao = match auth::exigir_sessao(&state, &cookies) {
        Ok(s) => s,
        Err(r) => return r,
    };
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match agendamentos::juntar_secundario(&conn, &id, &sessao.ministro.id).await {
        Ok(agendamento) => Json(agendamento).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn concluir_handler(
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
    match agendamentos::concluir(&conn, &id).await {
        Ok(agendamento) => Json(agendamento).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn cancelar_handler(
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
    match agendamentos::cancelar(&conn, &id).await {
        Ok(agendamento) => Json(agendamento).into_response(),
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
    match agendamentos::apagar(&conn, &id).await {
        Ok(()) => (StatusCode::OK, "Agendamento removido.").into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}
