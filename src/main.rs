// src/main.rs

mod agendamentos;
mod agendamentos_handlers;
mod auth;
mod db;
mod doentes;
mod doentes_handlers;
mod erro;
mod handlers;
mod ministros;
mod ministros_handlers;
mod relatorio;
mod relatorio_handlers;
mod relatorio_pdf;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;

#[tokio::main]
async fn main() {
    println!("🚀 A iniciar o servidor da Pastoral da Saúde...");

    // Garante a estrutura da base de dados e recupera as sessões gravadas
    if let Err(e) = db::ensure_estrutura(db::DB_FILE).await {
        eprintln!("🔥 Falha crítica ao preparar a base de dados: {}", e);
        return;
    }

    let sessoes = auth::Sessoes::nova(PathBuf::from(db::ARQUIVO_SESSOES));
    sessoes.restaurar().await;

    let app_state = auth::AppState {
        db_file: Arc::new(db::DB_FILE.to_string()),
        sessoes,
    };

    // Define todas as rotas da aplicação
    let app = Router::new()
        // Rotas de Autenticação e Sessão
        .route("/login", post(handlers::login_handler))
        .route("/login/codigo", post(handlers::login_codigo_handler))
        .route("/logout", post(handlers::logout_handler))
        .route("/sessao", get(handlers::sessao_handler))

        // Rotas de Ministros
        .route("/ministros", get(ministros_handlers::listar_handler))
        .route("/admin/ministros", post(ministros_handlers::criar_handler))
        .route("/admin/ministros/{id}", post(ministros_handlers::atualizar_handler))
        .route("/admin/ministros/{id}/senha", post(ministros_handlers::definir_senha_handler))
        .route("/admin/ministros/{id}/apagar", post(ministros_handlers::apagar_handler))

        // Rotas de Doentes
        .route("/doentes", get(doentes_handlers::listar_handler).post(doentes_handlers::criar_handler))
        .route("/doentes/{id}", get(doentes_handlers::buscar_handler).post(doentes_handlers::atualizar_handler))
        .route("/admin/doentes/{id}/apagar", post(doentes_handlers::apagar_handler))

        // Rotas de Agendamentos
        .route("/agendamentos", get(agendamentos_handlers::listar_handler))
        .route("/agendamentos/assumir", post(agendamentos_handlers::assumir_handler))
        .route("/agendamentos/{id}/juntar", post(agendamentos_handlers::juntar_handler))
        .route("/agendamentos/{id}/concluir", post(agendamentos_handlers::concluir_handler))
        .route("/agendamentos/{id}/cancelar", post(agendamentos_handlers::cancelar_handler))
        .route("/admin/agendamentos", post(agendamentos_handlers::criar_handler))
        .route("/admin/agendamentos/{id}/apagar", post(agendamentos_handlers::apagar_handler))

        // Rotas do Relatório
        .route("/relatorio", get(relatorio_handlers::relatorio_handler))
        .route("/relatorio/pdf", get(relatorio_handlers::relatorio_pdf_handler))

        .with_state(app_state)
        .layer(CookieManagerLayer::new());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("✅ Servidor a escutar em http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
