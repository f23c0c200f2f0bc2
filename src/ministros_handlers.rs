// src/ministros_handlers.rs

//! # Handlers de Ministros
//!
//! O registo e a manutenção de ministros são ações de administrador; a
//! listagem está aberta a qualquer ministro autenticado.

use crate::auth::{self, AppState};
use crate::{db, ministros};
use axum::http::StatusCode;
use axum::{
    debug_handler,
    extract::{Form, Path, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tower_cookies::Cookies;

#[derive(Debug, Deserialize)]
pub struct NovaSenhaForm {
    pub nova_senha: String,
}

#[debug_handler]
pub async fn listar_handler(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    if let Err(r) = auth::exigir_sessao(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match ministros::listar(&conn).await {
        Ok(lista) => Json(lista).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn criar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(novo): Json<ministros::NovoMinistro>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_admin(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match ministros::criar(&conn, novo).await {
        Ok(ministro) => {
            println!("✅ Ministro '{}' registado.", ministro.nome);
            (StatusCode::CREATED, Json(ministro)).into_response()
        }
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn atualizar_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
    Json(dados): Json<ministros::AtualizacaoMinistro>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_admin(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match ministros::atualizar(&conn, &id, dados).await {
        Ok(ministro) => Json(ministro).into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

/// Processa a alteração de senha de um ministro.
#[debug_handler]
pub async fn definir_senha_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<String>,
    Form(form): Form<NovaSenhaForm>,
) -> impl IntoResponse {
    if let Err(r) = auth::exigir_admin(&state, &cookies) {
        return r;
    }
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };
    match ministros::definir_senha(&conn, &id, &form.nova_senha).await {
        Ok(()) => (StatusCode::OK, "Senha alterada.").into_response(),
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
    match ministros::apagar(&conn, &id).await {
        Ok(()) => (StatusCode::OK, "Ministro removido.").into_response(),
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}
