// src/doentes.rs

//! # Módulo de Doentes
//!
//! Estruturas de dados e funções de acesso à base de dados para os doentes
//! visitados pela Pastoral da Saúde. Os telefones vivem numa tabela própria
//! e são embutidos no registo do doente na leitura.

use chrono::{DateTime, Local};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_rusqlite::Connection;
use unidecode::unidecode;
use uuid::Uuid;

use crate::erro::ErroApp;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Telefone {
    pub id: String,
    pub numero: String,
    pub rotulo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Doente {
    pub id: String,
    pub nome: String,
    pub endereco: String,
    pub setor: String,
    pub observacoes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub registrado_por: String,
    pub criado_em: DateTime<Local>,
    pub telefones: Vec<Telefone>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NovoTelefone {
    pub numero: String,
    pub rotulo: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NovoDoente {
    pub nome: String,
    pub endereco: String,
    pub setor: String,
    pub observacoes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub telefones: Vec<NovoTelefone>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FiltroDoentes {
    /// Filtro de igualdade pelo setor/zona.
    pub setor: Option<String>,
    /// Busca por nome, sem distinção de acentos ou maiúsculas.
    pub q: Option<String>,
}

/// Normaliza um texto para busca (minúsculas, sem acentos/cedilha).
fn normalizar_para_busca(texto: &str) -> String {
    unidecode(texto).to_lowercase()
}

const COLUNAS: &str =
    "id, nome, endereco, setor, observacoes, latitude, longitude, registrado_por, criado_em";

fn doente_da_linha(linha: &rusqlite::Row) -> rusqlite::Result<Doente> {
    Ok(Doente {
        id: linha.get(0)?,
        nome: linha.get(1)?,
        endereco: linha.get(2)?,
        setor: linha.get(3)?,
        observacoes: linha.get(4)?,
        latitude: linha.get(5)?,
        longitude: linha.get(6)?,
        registrado_por: linha.get(7)?,
        criado_em: linha.get(8)?,
        telefones: vec![],
    })
}

fn validar(novo: &NovoDoente) -> Result<(), ErroApp> {
    if novo.nome.trim().is_empty() || novo.endereco.trim().is_empty() || novo.setor.trim().is_empty()
    {
        return Err(ErroApp::Validacao(
            "Nome, endereço e setor são obrigatórios.".into(),
        ));
    }
    if novo.telefones.is_empty() || novo.telefones.iter().any(|t| t.numero.trim().is_empty()) {
        return Err(ErroApp::Validacao(
            "O doente precisa de pelo menos um telefone.".into(),
        ));
    }
    Ok(())
}

pub async fn listar(conn: &Connection, filtro: FiltroDoentes) -> Result<Vec<Doente>, ErroApp> {
    let doentes = conn
        .call(move |conn| {
            let mut condicoes: Vec<String> = Vec::new();
            let mut valores: Vec<String> = Vec::new();
            if let Some(setor) = filtro.setor.filter(|s| !s.is_empty()) {
                valores.push(setor);
                condicoes.push(format!("setor = ?{}", valores.len()));
            }
            if let Some(q) = filtro.q.filter(|q| !q.is_empty()) {
                valores.push(format!("%{}%", normalizar_para_busca(&q)));
                condicoes.push(format!("nome_normalizado LIKE ?{}", valores.len()));
            }

            let mut sql = format!("SELECT {COLUNAS} FROM doentes");
            if !condicoes.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&condicoes.join(" AND "));
            }
            sql.push_str(" ORDER BY nome");

            let mut stmt = conn.prepare(&sql)?;
            let linhas = stmt.query_map(rusqlite::params_from_iter(valores), doente_da_linha)?;
            let mut doentes: Vec<Doente> = linhas.collect::<Result<Vec<_>, _>>()?;

            // Embute os telefones de todos os doentes de uma só vez.
            let mut stmt_tel = conn.prepare(
                "SELECT doente_id, id, numero, rotulo FROM doente_telefones ORDER BY criado_em",
            )?;
            let mut telefones_map: HashMap<String, Vec<Telefone>> = HashMap::new();
            for res in stmt_tel.query_map([], |linha| {
                Ok((
                    linha.get::<_, String>(0)?,
                    Telefone {
                        id: linha.get(1)?,
                        numero: linha.get(2)?,
                        rotulo: linha.get(3)?,
                    },
                ))
            })? {
                let (doente_id, telefone) = res?;
                telefones_map.entry(doente_id).or_default().push(telefone);
            }
            for doente in &mut doentes {
                if let Some(telefones) = telefones_map.remove(&doente.id) {
                    doente.telefones = telefones;
                }
            }
            Ok(doentes)
        })
        .await?;
    Ok(doentes)
}

pub async fn buscar(conn: &Connection, id: &str) -> Result<Option<Doente>, ErroApp> {
    let id = id.to_string();
    let doente = conn
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUNAS} FROM doentes WHERE id = ?1"))?;
            let mut linhas = stmt.query_map([&id], doente_da_linha)?;
            let mut doente = match linhas.next().transpose()? {
                Some(d) => d,
                None => return Ok(None),
            };
            let mut stmt_tel = conn.prepare(
                "SELECT id, numero, rotulo FROM doente_telefones WHERE doente_id = ?1 ORDER BY criado_em",
            )?;
            doente.telefones = stmt_tel
                .query_map([&id], |linha| {
                    Ok(Telefone {
                        id: linha.get(0)?,
                        numero: linha.get(1)?,
                        rotulo: linha.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(doente))
        })
        .await?;
    Ok(doente)
}

/// Regista um doente e os seus telefones numa única transação, para que uma
/// falha a meio não deixe o doente sem telefones.
pub async fn criar(
    conn: &Connection,
    novo: NovoDoente,
    registrado_por: &str,
) -> Result<Doente, ErroApp> {
    validar(&novo)?;

    let agora = Local::now();
    let doente = Doente {
        id: Uuid::new_v4().to_string(),
        nome: novo.nome,
        endereco: novo.endereco,
        setor: novo.setor,
        observacoes: novo.observacoes,
        latitude: novo.latitude,
        longitude: novo.longitude,
        registrado_por: registrado_por.to_string(),
        criado_em: agora,
        telefones: novo
            .telefones
            .into_iter()
            .map(|t| Telefone {
                id: Uuid::new_v4().to_string(),
                numero: t.numero,
                rotulo: t.rotulo,
            })
            .collect(),
    };

    let gravar = doente.clone();
    conn.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO doentes (id, nome, nome_normalizado, endereco, setor, observacoes, latitude, longitude, registrado_por, criado_em)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                gravar.id,
                gravar.nome,
                normalizar_para_busca(&gravar.nome),
                gravar.endereco,
                gravar.setor,
                gravar.observacoes,
                gravar.latitude,
                gravar.longitude,
                gravar.registrado_por,
                gravar.criado_em,
            ],
        )?;
        for telefone in &gravar.telefones {
            tx.execute(
                "INSERT INTO doente_telefones (id, doente_id, numero, rotulo, criado_em)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![telefone.id, gravar.id, telefone.numero, telefone.rotulo, gravar.criado_em],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
    .await?;

    Ok(doente)
}

/// Atualiza os dados do doente e substitui a lista de telefones, tudo na
/// mesma transação.
pub async fn atualizar(conn: &Connection, id: &str, dados: NovoDoente) -> Result<Doente, ErroApp> {
    validar(&dados)?;

    let id_sql = id.to_string();
    let agora = Local::now();
    let alterados = conn
        .call(move |conn| {
            let tx = conn.transaction()?;
            let alterados = tx.execute(
                "UPDATE doentes SET nome = ?1, nome_normalizado = ?2, endereco = ?3, setor = ?4,
                        observacoes = ?5, latitude = ?6, longitude = ?7
                 WHERE id = ?8",
                params![
                    dados.nome,
                    normalizar_para_busca(&dados.nome),
                    dados.endereco,
                    dados.setor,
                    dados.observacoes,
                    dados.latitude,
                    dados.longitude,
                    id_sql,
                ],
            )?;
            if alterados > 0 {
                tx.execute("DELETE FROM doente_telefones WHERE doente_id = ?1", [&id_sql])?;
                for telefone in &dados.telefones {
                    tx.execute(
                        "INSERT INTO doente_telefones (id, doente_id, numero, rotulo, criado_em)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            Uuid::new_v4().to_string(),
                            id_sql,
                            telefone.numero,
                            telefone.rotulo,
                            agora,
                        ],
                    )?;
                }
            }
            tx.commit()?;
            Ok(alterados)
        })
        .await?;

    if alterados == 0 {
        return Err(ErroApp::NaoEncontrado("Doente".into()));
    }
    buscar(conn, id)
        .await?
        .ok_or_else(|| ErroApp::NaoEncontrado("Doente".into()))
}

/// Remove o doente e os telefones dependentes. Agendamentos que referenciem
/// o doente não são tocados.
pub async fn apagar(conn: &Connection, id: &str) -> Result<(), ErroApp> {
    let id_sql = id.to_string();
    let apagados = conn
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM doente_telefones WHERE doente_id = ?1", [&id_sql])?;
            let apagados = tx.execute("DELETE FROM doentes WHERE id = ?1", [&id_sql])?;
            tx.commit()?;
            Ok(apagados)
        })
        .await?;
    if apagados == 0 {
        return Err(ErroApp::NaoEncontrado("Doente".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn bd_teste() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let caminho = dir.path().join("teste.db").to_str().unwrap().to_string();
        db::ensure_estrutura(&caminho).await.unwrap();
        let conn = db::abrir(&caminho).await.unwrap();
        (dir, conn)
    }

    fn novo_doente(nome: &str, setor: &str) -> NovoDoente {
        NovoDoente {
            nome: nome.to_string(),
            endereco: "Rua das Flores, 12".to_string(),
            setor: setor.to_string(),
            observacoes: None,
            latitude: None,
            longitude: None,
            telefones: vec![NovoTelefone { numero: "912345678".into(), rotulo: Some("Filha".into()) }],
        }
    }

    #[tokio::test]
    async fn criar_exige_telefone() {
        let (_dir, conn) = bd_teste().await;
        let mut novo = novo_doente("Maria", "Centro");
        novo.telefones.clear();

        let erro = criar(&conn, novo, "m1").await.unwrap_err();
        assert!(matches!(erro, ErroApp::Validacao(_)));
    }

    #[tokio::test]
    async fn criar_grava_telefones() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_doente("Maria", "Centro"), "m1").await.unwrap();

        let lido = buscar(&conn, &criado.id).await.unwrap().unwrap();
        assert_eq!(lido.telefones.len(), 1);
        assert_eq!(lido.telefones[0].numero, "912345678");
        assert_eq!(lido.telefones[0].rotulo.as_deref(), Some("Filha"));
        assert_eq!(lido.registrado_por, "m1");
    }

    #[tokio::test]
    async fn busca_ignora_acentos() {
        let (_dir, conn) = bd_teste().await;
        criar(&conn, novo_doente("José António", "Centro"), "m1").await.unwrap();
        criar(&conn, novo_doente("Maria", "Norte"), "m1").await.unwrap();

        let filtro = FiltroDoentes { setor: None, q: Some("jose anto".into()) };
        let encontrados = listar(&conn, filtro).await.unwrap();
        assert_eq!(encontrados.len(), 1);
        assert_eq!(encontrados[0].nome, "José António");
    }

    #[tokio::test]
    async fn filtro_por_setor() {
        let (_dir, conn) = bd_teste().await;
        criar(&conn, novo_doente("Maria", "Norte"), "m1").await.unwrap();
        criar(&conn, novo_doente("Manuel", "Centro"), "m1").await.unwrap();

        let filtro = FiltroDoentes { setor: Some("Norte".into()), q: None };
        let encontrados = listar(&conn, filtro).await.unwrap();
        assert_eq!(encontrados.len(), 1);
        assert_eq!(encontrados[0].nome, "Maria");
    }

    #[tokio::test]
    async fn atualizar_substitui_telefones() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_doente("Maria", "Centro"), "m1").await.unwrap();

        let mut dados = novo_doente("Maria da Luz", "Sul");
        dados.telefones = vec![
            NovoTelefone { numero: "961111111".into(), rotulo: None },
            NovoTelefone { numero: "962222222".into(), rotulo: Some("Vizinho".into()) },
        ];
        let atualizado = atualizar(&conn, &criado.id, dados).await.unwrap();

        assert_eq!(atualizado.nome, "Maria da Luz");
        assert_eq!(atualizado.setor, "Sul");
        assert_eq!(atualizado.telefones.len(), 2);
        assert!(atualizado.telefones.iter().all(|t| t.numero != "912345678"));
    }

    #[tokio::test]
    async fn apagar_remove_telefones() {
        let (_dir, conn) = bd_teste().await;
        let criado = criar(&conn, novo_doente("Maria", "Centro"), "m1").await.unwrap();

        apagar(&conn, &criado.id).await.unwrap();
        assert!(buscar(&conn, &criado.id).await.unwrap().is_none());

        let restantes: i64 = conn
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM doente_telefones", [], |l| l.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(restantes, 0);
    }
}
