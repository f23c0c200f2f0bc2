// src/agendamentos.rs

//! # Módulo de Agendamentos
//!
//! Ciclo de vida das visitas aos doentes. Uma visita nasce `agendado`,
//! termina em `concluido` ou `cancelado`, e não sai mais de um estado
//! terminal. Um segundo ministro pode ocupar, uma única vez, a vaga de
//! acompanhante de uma visita ainda agendada.
//!
//! As transições e o preenchimento da vaga de acompanhante são atualizações
//! condicionais: a cláusula WHERE exige o estado de partida e o número de
//! linhas alteradas decide o resultado, sem janela entre ler e escrever.

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::erro::{violacao_unicidade, ErroApp};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StatusAgendamento {
    #[serde(rename = "agendado")]
    Agendado,
    #[serde(rename = "concluido")]
    Concluido,
    #[serde(rename = "cancelado")]
    Cancelado,
}

impl StatusAgendamento {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusAgendamento::Agendado => "agendado",
            StatusAgendamento::Concluido => "concluido",
            StatusAgendamento::Cancelado => "cancelado",
        }
    }

    fn parse(valor: &str) -> StatusAgendamento {
        match valor {
            "concluido" => StatusAgendamento::Concluido,
            "cancelado" => StatusAgendamento::Cancelado,
            _ => StatusAgendamento::Agendado,
        }
    }

    pub fn terminal(&self) -> bool {
        !matches!(self, StatusAgendamento::Agendado)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Agendamento {
    pub id: String,
    pub doente_id: String,
    pub ministro_primario: String,
    pub ministro_secundario: Option<String>,
    pub data: NaiveDate,
    pub hora: Option<String>,
    pub status: StatusAgendamento,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Local>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NovoAgendamento {
    pub doente_id: String,
    pub ministro_primario: String,
    pub ministro_secundario: Option<String>,
    pub data: NaiveDate,
    pub hora: Option<String>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FiltroAgendamentos {
    pub status: Option<StatusAgendamento>,
    pub doente_id: Option<String>,
    /// Visitas em que o ministro participa, como responsável ou acompanhante.
    pub ministro_id: Option<String>,
    pub de: Option<NaiveDate>,
    pub ate: Option<NaiveDate>,
}

const COLUNAS: &str = "id, doente_id, ministro_primario, ministro_secundario, data, hora, status, observacoes, criado_em";

fn agendamento_da_linha(linha: &rusqlite::Row) -> rusqlite::Result<Agendamento> {
    Ok(Agendamento {
        id: linha.get(0)?,
        doente_id: linha.get(1)?,
        ministro_primario: linha.get(2)?,
        ministro_secundario: linha.get(3)?,
        data: linha.get(4)?,
        hora: linha.get(5)?,
        status: StatusAgendamento::parse(&linha.get::<_, String>(6)?),
        observacoes: linha.get(7)?,
        criado_em: linha.get(8)?,
    })
}

pub async fn buscar(conn: &Connection, id: &str) -> Result<Option<Agendamento>, ErroApp> {
    let id = id.to_string();
    let agendamento = conn
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUNAS} FROM agendamentos WHERE id = ?1"))?;
            let mut linhas = stmt.query_map([&id], agendamento_da_linha)?;
            Ok(linhas.next().transpose()?)
        })
        .await?;
    Ok(agendamento)
}

pub async fn listar(
    conn: &Connection,
    filtro: FiltroAgendamentos,
) -> Result<Vec<Agendamento>, ErroApp> {
    let agendamentos = conn
        .call(move |conn| {
            let mut condicoes: Vec<String> = Vec::new();
            let mut valores: Vec<String> = Vec::new();
            if let Some(status) = filtro.status {
                valores.push(status.as_str().to_string());
                condicoes.push(format!("status = ?{}", valores.len()));
            }
            if let Some(doente_id) = filtro.doente_id.filter(|d| !d.is_empty()) {
                valores.push(doente_id);
                condicoes.push(format!("doente_id = ?{}", valores.len()));
            }
            if let Some(ministro_id) = filtro.ministro_id.filter(|m| !m.is_empty()) {
                valores.push(ministro_id);
                let n = valores.len();
                condicoes.push(format!("(ministro_primario = ?{n} OR ministro_secundario = ?{n})"));
            }
            if let Some(de) = filtro.de {
                valores.push(de.format("%Y-%m-%d").to_string());
                condicoes.push(format!("data >= ?{}", valores.len()));
            }
            if let Some(ate) = filtro.ate {
                valores.push(ate.format("%Y-%m-%d").to_string());
                condicoes.push(format!("data <= ?{}", valores.len()));
            }

            let mut sql = format!("SELECT {COLUNAS} FROM agendamentos");
            if !condicoes.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&condicoes.join(" AND "));
            }
            sql.push_str(" ORDER BY data, hora");

            let mut stmt = conn.prepare(&sql)?;
            let linhas = stmt.query_map(rusqlite::params_from_iter(valores), agendamento_da_linha)?;
            Ok(linhas.collect::<Result<Vec<_>, _>>()?)
        })
        .await?;
    Ok(agendamentos)
}

/// Cria uma visita no estado `agendado`.
///
/// O índice `idx_visita_ativa` rejeita a inserção se o doente já tiver uma
/// visita agendada.
pub async fn criar(conn: &Connection, novo: NovoAgendamento) -> Result<Agendamento, ErroApp> {
    if let Some(secundario) = &novo.ministro_secundario {
        if *secundario == novo.ministro_primario {
            return Err(ErroApp::Validacao(
                "O ministro acompanhante deve ser diferente do responsável.".into(),
            ));
        }
    }
    if novo.doente_id.trim().is_empty() || novo.ministro_primario.trim().is_empty() {
        return Err(ErroApp::Validacao(
            "Doente e ministro responsável são obrigatórios.".into(),
        ));
    }

    let agendamento = Agendamento {
        id: Uuid::new_v4().to_string(),
        doente_id: novo.doente_id,
        ministro_primario: novo.ministro_primario,
        ministro_secundario: novo.ministro_secundario,
        data: novo.data,
        hora: novo.hora,
        status: StatusAgendamento::Agendado,
        observacoes: novo.observacoes,
        criado_em: Local::now(),
    };

    let gravar = agendamento.clone();
    let res = conn
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agendamentos (id, doente_id, ministro_primario, ministro_secundario, data, hora, status, observacoes, criado_em)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    gravar.id,
                    gravar.doente_id,
                    gravar.ministro_primario,
                    gravar.ministro_secundario,
                    gravar.data,
                    gravar.hora,
                    gravar.status.as_str(),
                    gravar.observacoes,
                    gravar.criado_em,
                ],
            )?;
            Ok(())
        })
        .await;

    match res {
        Ok(()) => Ok(agendamento),
        Err(e) if violacao_unicidade(&e) => Err(ErroApp::RegraNegocio(
            "O doente já tem uma visita agendada.".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Criação rápida: o ministro assume já a visita ao doente, com a data e a
/// hora do momento.
pub async fn assumir_agora(
    conn: &Connection,
    doente_id: &str,
    ministro_id: &str,
) -> Result<Agendamento, ErroApp> {
    let agora = Local::now();
    criar(
        conn,
        NovoAgendamento {
            doente_id: doente_id.to_string(),
            ministro_primario: ministro_id.to_string(),
            ministro_secundario: None,
            data: agora.date_naive(),
            hora: Some(agora.format("%H:%M").to_string()),
            observacoes: None,
        },
    )
    .await
}

/// Ocupa a vaga de ministro acompanhante de uma visita agendada.
///
/// A vaga só é preenchida se ainda estiver vazia no momento da escrita;
/// dois pedidos simultâneos nunca ficam ambos com a vaga.
pub async fn juntar_secundario(
    conn: &Connection,
    agendamento_id: &str,
    ministro_id: &str,
) -> Result<Agendamento, ErroApp> {
    let id_sql = agendamento_id.to_string();
    let ministro_sql = ministro_id.to_string();
    let alterados = conn
        .call(move |conn| {
            Ok(conn.execute(
                "UPDATE agendamentos SET ministro_secundario = ?1
                 WHERE id = ?2 AND status = 'agendado'
                   AND ministro_secundario IS NULL AND ministro_primario <> ?1",
                params![ministro_sql, id_sql],
            )?)
        })
        .await?;

    if alterados == 0 {
        // A escrita condicional falhou; uma leitura diz porquê.
        return match buscar(conn, agendamento_id).await? {
            None => Err(ErroApp::NaoEncontrado("Agendamento".into())),
            Some(a) if a.status.terminal() => Err(ErroApp::ConflitoEstado(
                "A visita já foi concluída ou cancelada.".into(),
            )),
            Some(a) if a.ministro_primario == ministro_id => Err(ErroApp::RegraNegocio(
                "O ministro já é o responsável por esta visita.".into(),
            )),
            Some(a) if a.ministro_secundario.as_deref() == Some(ministro_id) => Err(
                ErroApp::RegraNegocio("O ministro já acompanha esta visita.".into()),
            ),
            Some(_) => Err(ErroApp::RegraNegocio(
                "A visita já tem um ministro acompanhante.".into(),
            )),
        };
    }

    buscar(conn, agendamento_id)
        .await?
        .ok_or_else(|| ErroApp::NaoEncontrado("Agendamento".into()))
}

pub async fn concluir(conn: &Connection, id: &str) -> Result<Agendamento, ErroApp> {
    transicionar(conn, id, StatusAgendamento::Concluido).await
}

pub async fn cancelar(conn: &Connection, id: &str) -> Result<Agendamento, ErroApp> {
    transicionar(conn, id, StatusAgendamento::Cancelado).await
}

/// Só visitas `agendado` podem mudar de estado; num estado terminal o pedido
/// é rejeitado com conflito.
async fn transicionar(
    conn: &Connection,
    id: &str,
    destino: StatusAgendamento,
) -> Result<Agendamento, ErroApp> {
    let id_sql = id.to_string();
    let alterados = conn
        .call(move |conn| {
            Ok(conn.execute(
                "UPDATE agendamentos SET status = ?1 WHERE id = ?2 AND status = 'agendado'",
                params![destino.as_str(), id_sql],
            )?)
        })
        .await?;

    if alterados == 0 {
        return match buscar(conn, id).await? {
            None => Err(ErroApp::NaoEncontrado("Agendamento".into())),
            Some(_) => Err(ErroApp::ConflitoEstado(
                "A visita já foi concluída ou cancelada e não pode mudar de estado.".into(),
            )),
        };
    }

    buscar(conn, id)
        .await?
        .ok_or_else(|| ErroApp::NaoEncontrado("Agendamento".into()))
}

pub async fn apagar(conn: &Connection, id: &str) -> Result<(), ErroApp> {
    let id_sql = id.to_string();
    let apagados = conn
        .call(move |conn| Ok(conn.execute("DELETE FROM agendamentos WHERE id = ?1", [&id_sql])?))
        .await?;
    if apagados == 0 {
        return Err(ErroApp::NaoEncontrado("Agendamento".into()));
    }
    Ok(())
}
