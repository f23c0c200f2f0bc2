// src/handlers.rs

//! # Handlers de Autenticação e Sessão

use crate::auth::{self, AppState, COOKIE_SESSAO};
use crate::db;
use axum::http::StatusCode;
use axum::{
    debug_handler,
    extract::{Form, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

/// Estrutura para deserializar os dados do formulário de login.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Deserialize)]
pub struct CodigoForm {
    pub codigo: i64,
}

#[debug_handler]
pub async fn login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(login): Form<LoginForm>,
) -> impl IntoResponse {
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };

    match state
        .sessoes
        .entrar_com_credenciais(&conn, &login.email, &login.senha)
        .await
    {
        Ok((sessao_id, sessao)) => {
            cookies.add(Cookie::new(COOKIE_SESSAO, sessao_id));
            Json(sessao).into_response()
        }
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn login_codigo_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CodigoForm>,
) -> impl IntoResponse {
    let conn = match db::abrir(&state.db_file).await {
        Ok(c) => c,
        Err(e) => return (e.status(), e.to_string()).into_response(),
    };

    match state.sessoes.entrar_com_codigo(&conn, form.codigo).await {
        Ok((sessao_id, sessao)) => {
            cookies.add(Cookie::new(COOKIE_SESSAO, sessao_id));
            Json(sessao).into_response()
        }
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[debug_handler]
pub async fn logout_handler(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    if let Some(cookie) = cookies.get(COOKIE_SESSAO) {
        state.sessoes.sair(cookie.value()).await;
        cookies.remove(Cookie::from(COOKIE_SESSAO));
    }
    (StatusCode::OK, "Sessão terminada.").into_response()
}

/// Devolve o ministro autenticado e o privilégio da sessão atual.
#[debug_handler]
pub async fn sessao_handler(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    match auth::exigir_sessao(&state, &cookies) {
        Ok(sessao) => Json(sessao).into_response(),
        Err(r) => r,
    }
}
