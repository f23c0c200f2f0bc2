// src/ministros.rs

//! # Módulo de Ministros
//!
//! Estruturas de dados e funções de acesso à base de dados para os
//! ministros da Pastoral da Saúde, as pessoas que realizam as visitas.
//!
//! Um ministro entra na aplicação por uma de duas vias: administradores com
//! email e senha, os restantes com o código de acesso numérico.

use chrono::{DateTime, Local};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::erro::{violacao_unicidade, ErroApp};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Funcao {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "user")]
    Utilizador,
}

impl Funcao {
    pub fn as_str(&self) -> &'static str {
        match self {
            Funcao::Admin => "admin",
            Funcao::Utilizador => "user",
        }
    }

    fn parse(valor: &str) -> Funcao {
        if valor == "admin" {
            Funcao::Admin
        } else {
            Funcao::Utilizador
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ministro {
    pub id: String,
    pub nome: String,
    pub email: String,
    pub telefone: String,
    pub funcao: Funcao,
    // O hash nunca sai da aplicação nas respostas JSON.
    #[serde(skip_serializing, default)]
    pub senha_hash: String,
    pub codigo_acesso: i64,
    pub desativado: bool,
    pub criado_em: DateTime<Local>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NovoMinistro {
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub telefone: String,
    pub funcao: Funcao,
    pub senha: String,
    pub codigo_acesso: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AtualizacaoMinistro {
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub telefone: String,
    pub funcao: Funcao,
    pub codigo_acesso: i64,
    #[serde(default)]
    pub desativado: bool,
}

const COLUNAS: &str =
    "id, nome, email, telefone, funcao, senha_hash, codigo_acesso, desativado, criado_em";

fn ministro_da_linha(linha: &rusqlite::Row) -> rusqlite::Result<Ministro> {
    Ok(Ministro {
        id: linha.get(0)?,
        nome: linha.get(1)?,
        email: linha.get(2)?,
        telefone: linha.get(3)?,
        funcao: Funcao::parse(&linha.get::<_, String>(4)?),
        senha_hash: linha.get(5)?,
        codigo_acesso: linha.get(6)?,
        desativado: linha.get(7)?,
        criado_em: linha.get(8)?,
    })
}

pub async fn listar(conn: &Connection) -> Result<Vec<Ministro>, ErroApp> {
    let ministros = conn
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUNAS} FROM ministros ORDER BY nome"))?;
            let linhas = stmt.query_map([], ministro_da_linha)?;
            Ok(linhas.collect::<Result<Vec<_>, _>>()?)
        })
        .await?;
    Ok(ministros)
}

pub async fn buscar(conn: &Connection, id: &str) -> Result<Option<Ministro>, ErroApp> {
    let id = id.to_string();
    let ministro = conn
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUNAS} FROM ministros WHERE id = ?1"))?;
            let mut linhas = stmt.query_map([&id], ministro_da_linha)?;
            Ok(linhas.next().transpose()?)
        })
        .await?;
    Ok(ministro)
}

pub async fn buscar_por_email(conn: &Connection, email: &str) -> Result<Option<Ministro>, ErroApp> {
    let email = email.to_string();
    let ministro = conn
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUNAS} FROM ministros WHERE email = ?1"))?;
            let mut linhas = stmt.query_map([&email], ministro_da_linha)?;
            Ok(linhas.next().transpose()?)
        })
        .await?;
    Ok(ministro)
}

pub async fn buscar_por_codigo(conn: &Connection, codigo: i64) -> Result<Option<Ministro>, ErroApp> {
    let ministro = conn
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUNAS} FROM ministros WHERE codigo_acesso = ?1"))?;
            let mut linhas = stmt.query_map([codigo], ministro_da_linha)?;
            Ok(linhas.next().transpose()?)
        })
        .await?;
    Ok(ministro)
}

pub async fn criar(conn: &Connection, novo: NovoMinistro) -> Result<Ministro, ErroApp> {
    if novo.nome.trim().is_empty() || novo.email.trim().is_empty() {
        return Err(ErroApp::Validacao("Nome e email são obrigatórios.".into()));
    }
    if novo.senha.is_empty() {
        return Err(ErroApp::Validacao("A senha é obrigatória.".into()));
    }

    let senha_hash = bcrypt::hash(&novo.senha, bcrypt::DEFAULT_COST)
        .map_err(|e| ErroApp::Interna(format!("Erro ao gerar hash da senha: {e}")))?;
    let ministro = Ministro {
        id: Uuid::new_v4().to_string(),
        nome: novo.nome,
        email: novo.email,
        telefone: novo.telefone,
        funcao: novo.funcao,
        senha_hash,
        codigo_acesso: novo.codigo_acesso,
        desativado: false,
        criado_em: Local::now(),
    };

    let gravar = ministro.clone();
    let res = conn
        .call(move |conn| {
            conn.execute(
                "INSERT INTO ministros (id, nome, email, telefone, funcao, senha_hash, codigo_acesso, desativado, criado_em)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    gravar.id,
                    gravar.nome,
                    gravar.email,
                    gravar.telefone,
                    gravar.funcao.as_str(),
                    gravar.senha_hash,
                    gravar.codigo_acesso,
                    gravar.desativado,
                    gravar.criado_em,
                ],
            )?;
            Ok(())
        })
        .await;

    match res {
        Ok(()) => Ok(ministro),
        Err(e) if violacao_unicidade(&e) => Err(ErroApp::RegraNegocio(
            "Já existe um ministro com este email ou código de acesso.".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn atualizar(
    conn: &Connection,
    id: &str,
    dados: AtualizacaoMinistro,
) -> Result<Ministro, ErroApp> {
    if dados.nome.trim().is_empty() || dados.email.trim().is_empty() {
        return Err(ErroApp::Validacao("Nome e email são obrigatórios.".into()));
    }

    let id_sql = id.to_string();
    let res = conn
        .call(move |conn| {
            Ok(conn.execute(
                "UPDATE ministros SET nome = ?1, email = ?2, telefone = ?3, funcao = ?4, codigo_acesso = ?5, desativado = ?6
                 WHERE id = ?7",
                params![
                    dados.nome,
                    dados.email,
                    dados.telefone,
                    dados.funcao.as_str(),
                    dados.codigo_acesso,
                    dados.desativado,
                    id_sql,
                ],
            )?)
        })
        .await;

    let alterados = match res {
        Ok(n) => n,
        Err(e) if violacao_unicidade(&e) => {
            return Err(ErroApp::RegraNegocio(
                "Já existe um ministro com este email ou código de acesso.".into(),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    if alterados == 0 {
        return Err(ErroApp::NaoEncontrado("Ministro".into()));
    }
    buscar(conn, id)
        .await?
        .ok_or_else(|| ErroApp::NaoEncontrado("Ministro".into()))
}

/// Grava um novo hash de senha para o ministro.
pub async fn definir_senha(conn: &Connection, id: &str, nova_senha: &str) -> Result<(), ErroApp> {
    if nova_senha.is_empty() {
        return Err(ErroApp::Validacao("A senha é obrigatória.".into()));
    }
    let senha_hash = bcrypt::hash(nova_senha, bcrypt::DEFAULT_COST)
        .map_err(|e| ErroApp::Interna(format!("Erro ao gerar hash da senha: {e}")))?;

    let id_sql = id.to_string();
    let alterados = conn
        .call(move |conn| {
            Ok(conn.execute(
                "UPDATE ministros SET senha_hash = ?1 WHERE id = ?2",
                params![senha_hash, id_sql],
            )?)
        })
        .await?;
    if alterados == 0 {
        return Err(ErroApp::NaoEncontrado("Ministro".into()));
    }
    Ok(())
}

/// Remove um ministro que não esteja associado a nenhuma visita.
///
/// A verificação e a remoção correm na mesma transação, pelo que um
/// agendamento criado em simultâneo não deixa a referência pendurada.
pub async fn apagar(conn: &Connection, id: &str) -> Result<(), ErroApp> {
    let id_sql = id.to_string();
    let (referencias, apagados) = conn
        .call(move |conn| {
            let tx = conn.transaction()?;
            let referencias: i64 = tx.query_row(
                "SELECT COUNT(*) FROM agendamentos WHERE ministro_primario = ?1 OR ministro_secundario = ?1",
                [&id_sql],
                |linha| linha.get(0),
            )?;
            let apagados = if referencias == 0 {
                tx.execute("DELETE FROM ministros WHERE id = ?1", [&id_sql])?
            } else {
                0
            };
            tx.commit()?;
            Ok((referencias, apagados))
        })
        .await?;

    if referencias > 0 {
        return Err(ErroApp::RegraNegocio(format!(
            "O ministro está associado a {referencias} visita(s) e não pode ser removido."
        )));
    }
    if apagados == 0 {
        return Err(ErroApp::NaoEncontrado("Ministro".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{agendamentos, db, doentes};
    use chrono::NaiveDate;

    async fn bd_teste() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let caminho = dir.path().join("teste.db").to_str().unwrap().to_string();
        db::ensure_estrutura(&caminho).await.unwrap();
        let conn = db::abrir(&caminho).await.unwrap();
        (dir, conn)
    }

    fn novo_ministro(nome: &str, codigo: i64) -> NovoMinistro {
        NovoMinistro {
            nome: nome.to_string(),
            email: format!("{}@pastoral.local", nome.to_lowercase()),
            telefone: String::new(),
            funcao: Funcao::Utilizador,
            senha: "1234".to_string(),
            codigo_acesso: codigo,
        }
    }

    #[tokio::test]
    async fn criar_e_buscar_por_codigo() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_ministro("Joana", 2001)).await.unwrap();

        let encontrado = buscar_por_codigo(&conn, 2001).await.unwrap().unwrap();
        assert_eq!(encontrado.id, criado.id);
        assert_eq!(encontrado.funcao, Funcao::Utilizador);
        assert!(!encontrado.desativado);
    }

    #[tokio::test]
    async fn codigo_duplicado_rejeitado() {
        let (_dir, conn) = bd_teste().await;
        criar(&conn, novo_ministro("Joana", 2001)).await.unwrap();

        let erro = criar(&conn, novo_ministro("Pedro", 2001)).await.unwrap_err();
        assert!(matches!(erro, ErroApp::RegraNegocio(_)));
    }

    #[tokio::test]
    async fn apagar_sem_visitas_remove() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_ministro("Joana", 2001)).await.unwrap();

        apagar(&conn, &criado.id).await.unwrap();
        assert!(buscar(&conn, &criado.id).await.unwrap().is_none());
        assert!(listar(&conn).await.unwrap().iter().all(|m| m.id != criado.id));
    }

    #[tokio::test]
    async fn apagar_com_visitas_falha() {
        let (_dir, conn) = bd_teste().await;
        let ministro = criar(&conn, novo_ministro("Joana", 2001)).await.unwrap();
        let doente = doentes::criar(
            &conn,
            doentes::NovoDoente {
                nome: "Maria".into(),
                endereco: "Rua das Flores, 12".into(),
                setor: "Centro".into(),
                observacoes: None,
                latitude: None,
                longitude: None,
                telefones: vec![doentes::NovoTelefone { numero: "912345678".into(), rotulo: None }],
            },
            &ministro.id,
        )
        .await
        .unwrap();
        agendamentos::criar(
            &conn,
            agendamentos::NovoAgendamento {
                doente_id: doente.id,
                ministro_primario: ministro.id.clone(),
                ministro_secundario: None,
                data: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
                hora: Some("15:00".into()),
                observacoes: None,
            },
        )
        .await
        .unwrap();

        let erro = apagar(&conn, &ministro.id).await.unwrap_err();
        match erro {
            ErroApp::RegraNegocio(mensagem) => assert!(mensagem.contains("visita")),
            outro => panic!("esperava erro de regra de negócio, veio: {outro}"),
        }
        assert!(buscar(&conn, &ministro.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn definir_senha_substitui_hash() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_ministro("Joana", 2001)).await.unwrap();

        definir_senha(&conn, &criado.id, "nova-senha").await.unwrap();
        let atualizado = buscar(&conn, &criado.id).await.unwrap().unwrap();
        assert!(bcrypt::verify("nova-senha", &atualizado.senha_hash).unwrap());
        assert!(!bcrypt::verify("1234", &atualizado.senha_hash).unwrap());
    }
}
