// src/erro.rs

//! # Erros da Aplicação
//!
//! Tipo de erro partilhado pelos módulos de dados e pelos handlers, com a
//! tradução para o código HTTP correspondente.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErroApp {
    #[error("Erro de base de dados: {0}")]
    BaseDados(#[from] tokio_rusqlite::Error),

    #[error("{0} não encontrado.")]
    NaoEncontrado(String),

    #[error("{0}")]
    ConflitoEstado(String),

    #[error("{0}")]
    RegraNegocio(String),

    #[error("{0}")]
    Validacao(String),

    #[error("Credenciais incorretas.")]
    CredenciaisInvalidas,

    #[error("{0}")]
    Interna(String),
}

impl ErroApp {
    /// Código HTTP com que o erro é devolvido ao cliente.
    pub fn status(&self) -> StatusCode {
        match self {
            ErroApp::BaseDados(_) | ErroApp::Interna(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErroApp::NaoEncontrado(_) => StatusCode::NOT_FOUND,
            ErroApp::ConflitoEstado(_) | ErroApp::RegraNegocio(_) => StatusCode::CONFLICT,
            ErroApp::Validacao(_) => StatusCode::BAD_REQUEST,
            ErroApp::CredenciaisInvalidas => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Verifica se o erro corresponde a uma violação de unicidade do SQLite.
pub fn violacao_unicidade(erro: &tokio_rusqlite::Error) -> bool {
    matches!(
        erro,
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
