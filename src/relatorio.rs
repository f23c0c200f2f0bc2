// src/relatorio.rs

//! # Relatório de Visitas
//!
//! Monta as linhas do relatório filtrado. Os agendamentos, ministros e
//! doentes são lidos em buscas independentes e o cruzamento é feito aqui
//! por mapa de ids; um registo entretanto removido aparece como "N/A" em
//! vez de derrubar o relatório.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_rusqlite::Connection;

use crate::agendamentos::{self, FiltroAgendamentos, StatusAgendamento};
use crate::doentes::{self, FiltroDoentes};
use crate::erro::ErroApp;
use crate::ministros;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FiltroRelatorio {
    pub status: Option<StatusAgendamento>,
    pub ministro_id: Option<String>,
    pub setor: Option<String>,
    pub de: Option<NaiveDate>,
    pub ate: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Clone)]
pub struct LinhaRelatorio {
    pub agendamento_id: String,
    pub data: NaiveDate,
    pub hora: Option<String>,
    pub status: StatusAgendamento,
    pub nome_doente: String,
    pub setor: String,
    pub endereco: String,
    pub nome_ministro_primario: String,
    pub nome_ministro_secundario: Option<String>,
    pub observacoes: Option<String>,
}

pub async fn montar(
    conn: &Connection,
    filtro: FiltroRelatorio,
) -> Result<Vec<LinhaRelatorio>, ErroApp> {
    let visitas = agendamentos::listar(
        conn,
        FiltroAgendamentos {
            status: filtro.status,
            doente_id: None,
            ministro_id: filtro.ministro_id.clone(),
            de: filtro.de,
            ate: filtro.ate,
        },
    )
    .await?;
    let ministros = ministros::listar(conn).await?;
    let doentes = doentes::listar(conn, FiltroDoentes::default()).await?;

    let nomes_ministros: HashMap<String, String> =
        ministros.into_iter().map(|m| (m.id.clone(), m.nome)).collect();
    let doentes_por_id: HashMap<String, doentes::Doente> =
        doentes.into_iter().map(|d| (d.id.clone(), d)).collect();

    let filtro_setor = filtro.setor.filter(|s| !s.is_empty());
    let mut linhas = Vec::new();
    for visita in visitas {
        let (nome_doente, setor, endereco) = match doentes_por_id.get(&visita.doente_id) {
            Some(d) => (d.nome.clone(), d.setor.clone(), d.endereco.clone()),
            None => ("N/A".to_string(), "N/A".to_string(), String::new()),
        };
        if let Some(f) = &filtro_setor {
            if *f != setor {
                continue;
            }
        }
        let nome_primario = nomes_ministros
            .get(&visita.ministro_primario)
            .cloned()
            .unwrap_or_else(|| "N/A".to_string());
        let nome_secundario = visita.ministro_secundario.as_ref().map(|id| {
            nomes_ministros.get(id).cloned().unwrap_or_else(|| "N/A".to_string())
        });

        linhas.push(LinhaRelatorio {
            agendamento_id: visita.id,
            data: visita.data,
            hora: visita.hora,
            status: visita.status,
            nome_doente,
            setor,
            endereco,
            nome_ministro_primario: nome_primario,
            nome_ministro_secundario: nome_secundario,
            observacoes: visita.observacoes,
        });
    }
    Ok(linhas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ministros::Funcao;

    async fn bd_teste() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let caminho = dir.path().join("teste.db").to_str().unwrap().to_string();
        db::ensure_estrutura(&caminho).await.unwrap();
        let conn = db::abrir(&caminho).await.unwrap();
        (dir, conn)
    }

    async fn preparar(conn: &Connection) -> (String, String) {
        let ministro = ministros::criar(
            conn,
            ministros::NovoMinistro {
                nome: "Ana".into(),
                email: "ana@pastoral.local".into(),
                telefone: String::new(),
                funcao: Funcao::Utilizador,
                senha: "1234".into(),
                codigo_acesso: 2001,
            },
        )
        .await
        .unwrap();
        let doente = doentes::criar(
            conn,
            doentes::NovoDoente {
                nome: "Maria".into(),
                endereco: "Rua das Flores, 12".into(),
                setor: "Centro".into(),
                observacoes: None,
                latitude: None,
                longitude: None,
                telefones: vec![doentes::NovoTelefone {
                    numero: "912345678".into(),
                    rotulo: None,
                }],
            },
            &ministro.id,
        )
        .await
        .unwrap();
        (ministro.id, doente.id)
    }

    #[tokio::test]
    async fn linhas_cruzam_nomes() {
        let (_dir, conn) = bd_teste().await;
        let (ministro_id, doente_id) = preparar(&conn).await;
        agendamentos::assumir_agora(&conn, &doente_id, &ministro_id).await.unwrap();

        let linhas = montar(&conn, FiltroRelatorio::default()).await.unwrap();
        assert_eq!(linhas.len(), 1);
        assert_eq!(linhas[0].nome_doente, "Maria");
        assert_eq!(linhas[0].nome_ministro_primario, "Ana");
        assert_eq!(linhas[0].setor, "Centro");
        assert!(linhas[0].nome_ministro_secundario.is_none());
    }

    #[tokio::test]
    async fn filtro_por_setor_exclui_outros() {
        let (_dir, conn) = bd_teste().await;
        let (ministro_id, doente_id) = preparar(&conn).await;
        agendamentos::assumir_agora(&conn, &doente_id, &ministro_id).await.unwrap();

        let filtro = FiltroRelatorio { setor: Some("Norte".into()), ..Default::default() };
        assert!(montar(&conn, filtro).await.unwrap().is_empty());

        let filtro = FiltroRelatorio { setor: Some("Centro".into()), ..Default::default() };
        assert_eq!(montar(&conn, filtro).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn doente_removido_aparece_como_na() {
        let (_dir, conn) = bd_teste().await;
        let (ministro_id, doente_id) = preparar(&conn).await;
        agendamentos::assumir_agora(&conn, &doente_id, &ministro_id).await.unwrap();
        doentes::apagar(&conn, &doente_id).await.unwrap();

        // A visita órfã continua listada, com o doente a "N/A".
        let linhas = montar(&conn, FiltroRelatorio::default()).await.unwrap();
        assert_eq!(linhas.len(), 1);
        assert_eq!(linhas[0].nome_doente, "N/A");
    }
}
