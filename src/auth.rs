// src/auth.rs

//! # Sessões e Funções
//!
//! Guarda quem está a usar a aplicação e com que privilégios. As sessões
//! vivem em memória, são persistidas em `data/sessoes.json` para sobreviver
//! a reinícios, e só mudam através das três operações do serviço
//! [`Sessoes`]: entrar (por credenciais ou por código), e sair.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio_rusqlite::Connection;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::erro::ErroApp;
use crate::ministros::{self, Funcao, Ministro};

pub const COOKIE_SESSAO: &str = "sessao_id";

/// Representa o estado partilhado da aplicação.
#[derive(Clone)]
pub struct AppState {
    pub db_file: Arc<String>,
    pub sessoes: Sessoes,
}

/// Uma sessão autenticada: o ministro e o privilégio com que entrou.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sessao {
    pub ministro: Ministro,
    pub admin: bool,
}

/// Serviço de sessões. Dono exclusivo do mapa de sessões ativas e do
/// ficheiro onde este é persistido.
#[derive(Clone)]
pub struct Sessoes {
    arquivo: Arc<PathBuf>,
    mapa: Arc<Mutex<HashMap<String, Sessao>>>,
}

impl Sessoes {
    pub fn nova(arquivo: PathBuf) -> Sessoes {
        Sessoes {
            arquivo: Arc::new(arquivo),
            mapa: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Recarrega as sessões persistidas. Um ficheiro ilegível é descartado
    /// em silêncio e a aplicação arranca sem sessões.
    pub async fn restaurar(&self) {
        let conteudo = match fs::read_to_string(self.arquivo.as_ref()).await {
            Ok(c) => c,
            Err(_) => return,
        };
        match serde_json::from_str::<HashMap<String, Sessao>>(&conteudo) {
            Ok(mapa) => {
                *self.mapa.lock().unwrap() = mapa;
            }
            Err(_) => {
                let _ = fs::remove_file(self.arquivo.as_ref()).await;
            }
        }
    }

    /// Entrada de administrador, com email e senha.
    ///
    /// Ministros sem função de administrador não entram por esta via, mesmo
    /// com a senha certa: para eles existe o código de acesso.
    pub async fn entrar_com_credenciais(
        &self,
        conn: &Connection,
        email: &str,
        senha: &str,
    ) -> Result<(String, Sessao), ErroApp> {
        let ministro = ministros::buscar_por_email(conn, email)
            .await?
            .ok_or(ErroApp::CredenciaisInvalidas)?;
        if !bcrypt::verify(senha, &ministro.senha_hash).unwrap_or(false) {
            return Err(ErroApp::CredenciaisInvalidas);
        }
        if ministro.desativado {
            return Err(ErroApp::RegraNegocio("O ministro está desativado.".into()));
        }
        if ministro.funcao != Funcao::Admin {
            return Err(ErroApp::RegraNegocio(
                "O acesso com email e senha é exclusivo dos administradores. Utilize o código de acesso.".into(),
            ));
        }
        Ok(self.abrir_sessao(Sessao { ministro, admin: true }).await)
    }

    /// Entrada com o código de acesso numérico.
    ///
    /// Qualquer ministro pode entrar por código, mas a sessão fica sempre
    /// sem privilégios de administração, seja qual for a função do
    /// ministro.
    pub async fn entrar_com_codigo(
        &self,
        conn: &Connection,
        codigo: i64,
    ) -> Result<(String, Sessao), ErroApp> {
        let ministro = ministros::buscar_por_codigo(conn, codigo)
            .await?
            .ok_or(ErroApp::CredenciaisInvalidas)?;
        if ministro.desativado {
            return Err(ErroApp::RegraNegocio("O ministro está desativado.".into()));
        }
        Ok(self.abrir_sessao(Sessao { ministro, admin: false }).await)
    }

    /// Termina a sessão. Nunca falha: se a escrita do ficheiro correr mal o
    /// problema fica no log e a sessão já saiu da memória.
    pub async fn sair(&self, sessao_id: &str) {
        self.mapa.lock().unwrap().remove(sessao_id);
        self.gravar().await;
    }

    pub fn obter(&self, sessao_id: &str) -> Option<Sessao> {
        self.mapa.lock().unwrap().get(sessao_id).cloned()
    }

    async fn abrir_sessao(&self, sessao: Sessao) -> (String, Sessao) {
        let sessao_id = Uuid::new_v4().to_string();
        self.mapa
            .lock()
            .unwrap()
            .insert(sessao_id.clone(), sessao.clone());
        self.gravar().await;
        (sessao_id, sessao)
    }

    async fn gravar(&self) {
        let copia = self.mapa.lock().unwrap().clone();
        match serde_json::to_string_pretty(&copia) {
            Ok(json) => {
                if let Err(e) = fs::write(self.arquivo.as_ref(), json).await {
                    eprintln!("🔥 Falha ao gravar o ficheiro de sessões: {}", e);
                }
            }
            Err(e) => eprintln!("🔥 Falha ao serializar as sessões: {}", e),
        }
    }
}

/// Resolve a sessão do pedido a partir do cookie, ou responde 401.
pub fn exigir_sessao(state: &AppState, cookies: &Cookies) -> Result<Sessao, Response> {
    let sessao_id = match cookies.get(COOKIE_SESSAO) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            return Err(
                (StatusCode::UNAUTHORIZED, "Sessão inválida. Inicie sessão novamente.")
                    .into_response(),
            )
        }
    };
    state.sessoes.obter(&sessao_id).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, "Sessão inválida. Inicie sessão novamente.").into_response()
    })
}

/// Como [`exigir_sessao`], mas só deixa passar sessões de administrador.
pub fn exigir_admin(state: &AppState, cookies: &Cookies) -> Result<Sessao, Response> {
    let sessao = exigir_sessao(state, cookies)?;
    if !sessao.admin {
        return Err(
            (StatusCode::FORBIDDEN, "Acesso negado. Apenas para administradores.").into_response(),
        );
    }
    Ok(sessao)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn ambiente() -> (tempfile::TempDir, Connection, Sessoes) {
        let dir = tempfile::tempdir().unwrap();
        let caminho = dir.path().join("teste.db").to_str().unwrap().to_string();
        db::ensure_estrutura(&caminho).await.unwrap();
        let conn = db::abrir(&caminho).await.unwrap();
        let sessoes = Sessoes::nova(dir.path().join("sessoes.json"));
        (dir, conn, sessoes)
    }

    async fn criar_ministro(conn: &Connection, funcao: Funcao, codigo: i64) -> Ministro {
        ministros::criar(
            conn,
            ministros::NovoMinistro {
                nome: "Joana".into(),
                email: format!("joana{codigo}@pastoral.local"),
                telefone: String::new(),
                funcao,
                senha: "1234".into(),
                codigo_acesso: codigo,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn credenciais_de_admin_abrem_sessao_admin() {
        let (_dir, conn, sessoes) = ambiente().await;
        let admin = criar_ministro(&conn, Funcao::Admin, 2001).await;

        let (sessao_id, sessao) = sessoes
            .entrar_com_credenciais(&conn, &admin.email, "1234")
            .await
            .unwrap();
        assert!(sessao.admin);
        assert_eq!(sessao.ministro.id, admin.id);
        assert!(sessoes.obter(&sessao_id).is_some());
    }

    #[tokio::test]
    async fn credenciais_de_utilizador_rejeitadas() {
        let (_dir, conn, sessoes) = ambiente().await;
        let comum = criar_ministro(&conn, Funcao::Utilizador, 2001).await;

        // Mesmo com a senha certa, um ministro comum não entra por email.
        let erro = sessoes
            .entrar_com_credenciais(&conn, &comum.email, "1234")
            .await
            .unwrap_err();
        assert!(matches!(erro, ErroApp::RegraNegocio(_)));
    }

    #[tokio::test]
    async fn senha_errada_rejeitada() {
        let (_dir, conn, sessoes) = ambiente().await;
        let admin = criar_ministro(&conn, Funcao::Admin, 2001).await;

        let erro = sessoes
            .entrar_com_credenciais(&conn, &admin.email, "errada")
            .await
            .unwrap_err();
        assert!(matches!(erro, ErroApp::CredenciaisInvalidas));
    }

    #[tokio::test]
    async fn codigo_nunca_abre_sessao_admin() {
        let (_dir, conn, sessoes) = ambiente().await;
        let admin = criar_ministro(&conn, Funcao::Admin, 2001).await;

        // Atenção: mesmo um administrador que entre pelo código de acesso
        // fica com uma sessão sem privilégios de administração. É o
        // comportamento em vigor; se algum dia parecer um engano, é aqui
        // que se muda.
        let (_id, sessao) = sessoes.entrar_com_codigo(&conn, 2001).await.unwrap();
        assert_eq!(sessao.ministro.id, admin.id);
        assert!(!sessao.admin);
    }

    #[tokio::test]
    async fn codigo_desconhecido_rejeitado() {
        let (_dir, conn, sessoes) = ambiente().await;

        let erro = sessoes.entrar_com_codigo(&conn, 9999).await.unwrap_err();
        assert!(matches!(erro, ErroApp::CredenciaisInvalidas));
    }

    #[tokio::test]
    async fn ministro_desativado_nao_entra() {
        let (_dir, conn, sessoes) = ambiente().await;
        let comum = criar_ministro(&conn, Funcao::Utilizador, 2001).await;
        ministros::atualizar(
            &conn,
            &comum.id,
            ministros::AtualizacaoMinistro {
                nome: comum.nome.clone(),
                email: comum.email.clone(),
                telefone: comum.telefone.clone(),
                funcao: comum.funcao,
                codigo_acesso: comum.codigo_acesso,
                desativado: true,
            },
        )
        .await
        .unwrap();

        let erro = sessoes.entrar_com_codigo(&conn, 2001).await.unwrap_err();
        assert!(matches!(erro, ErroApp::RegraNegocio(_)));
    }

    #[tokio::test]
    async fn sair_limpa_memoria_e_persistencia() {
        let (dir, conn, sessoes) = ambiente().await;
        criar_ministro(&conn, Funcao::Utilizador, 2001).await;
        let (sessao_id, _) = sessoes.entrar_com_codigo(&conn, 2001).await.unwrap();

        sessoes.sair(&sessao_id).await;
        assert!(sessoes.obter(&sessao_id).is_none());

        let persistido = fs::read_to_string(dir.path().join("sessoes.json")).await.unwrap();
        let mapa: HashMap<String, Sessao> = serde_json::from_str(&persistido).unwrap();
        assert!(mapa.is_empty());
    }

    #[tokio::test]
    async fn sessao_sobrevive_a_reinicio() {
        let (dir, conn, sessoes) = ambiente().await;
        criar_ministro(&conn, Funcao::Utilizador, 2001).await;
        let (sessao_id, _) = sessoes.entrar_com_codigo(&conn, 2001).await.unwrap();

        // Um serviço novo apontado ao mesmo ficheiro recupera a sessão.
        let renascidas = Sessoes::nova(dir.path().join("sessoes.json"));
        renascidas.restaurar().await;
        let sessao = renascidas.obter(&sessao_id).unwrap();
        assert!(!sessao.admin);
        assert_eq!(sessao.ministro.codigo_acesso, 2001);
    }

    #[tokio::test]
    async fn ficheiro_corrompido_descartado_em_silencio() {
        let dir = tempfile::tempdir().unwrap();
        let arquivo = dir.path().join("sessoes.json");
        fs::write(&arquivo, "{ isto nao é json").await.unwrap();

        let sessoes = Sessoes::nova(arquivo.clone());
        sessoes.restaurar().await;

        assert!(sessoes.obter("qualquer").is_none());
        assert!(!arquivo.exists());
    }
}
