// src/db.rs

//! # Inicialização da Base de Dados
//!
//! Cria o esquema SQLite da aplicação (ministros, doentes, telefones e
//! agendamentos) e semeia o administrador inicial na primeira execução.

use chrono::Local;
use rusqlite::params;
use tokio::fs;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::erro::ErroApp;

pub const DB_FILE: &str = "data/pastoral.db";
pub const ARQUIVO_SESSOES: &str = "data/sessoes.json";

/// Email e código de acesso do administrador semeado na primeira execução.
pub const EMAIL_ADMIN_INICIAL: &str = "admin@pastoral.local";
pub const CODIGO_ADMIN_INICIAL: i64 = 1000;

/// Abre uma ligação à base de dados indicada.
///
/// As chaves estrangeiras declaradas no esquema são apenas documentais: o
/// desenho trata a integridade entre entidades ao nível da aplicação e
/// tolera referências órfãs (ver relatório com "N/A"). Desligamos por isso
/// explicitamente a verificação de chaves estrangeiras — no SQLite padrão
/// já vem desligada, aqui apenas o garantimos.
pub async fn abrir(db_file: &str) -> Result<Connection, ErroApp> {
    let conn = Connection::open(db_file.to_string()).await?;
    conn.call(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        Ok(())
    })
    .await?;
    Ok(conn)
}

/// Garante que o diretório de dados e o esquema da base de dados existem.
///
/// O índice parcial `idx_visita_ativa` garante, ao nível da base de dados,
/// que cada doente tem no máximo uma visita em estado `agendado`.
pub async fn ensure_estrutura(db_file: &str) -> Result<(), ErroApp> {
    if let Some(pasta) = std::path::Path::new(db_file).parent() {
        if let Err(e) = fs::create_dir_all(pasta).await {
            eprintln!("🔥 Falha crítica ao criar o diretório '{}': {}", pasta.display(), e);
        }
    }

    let conn = Connection::open(db_file.to_string()).await?;
    let semeado = conn
        .call(|conn| {
            conn.execute_batch(
                "BEGIN;
                CREATE TABLE IF NOT EXISTS ministros (
                    id TEXT PRIMARY KEY,
                    nome TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    telefone TEXT NOT NULL DEFAULT '',
                    funcao TEXT NOT NULL,
                    senha_hash TEXT NOT NULL,
                    codigo_acesso INTEGER NOT NULL UNIQUE,
                    desativado INTEGER NOT NULL DEFAULT 0,
                    criado_em TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS doentes (
                    id TEXT PRIMARY KEY,
                    nome TEXT NOT NULL,
                    nome_normalizado TEXT NOT NULL,
                    endereco TEXT NOT NULL,
                    setor TEXT NOT NULL,
                    observacoes TEXT,
                    latitude REAL,
                    longitude REAL,
                    registrado_por TEXT NOT NULL,
                    criado_em TEXT NOT NULL,
                    FOREIGN KEY (registrado_por) REFERENCES ministros (id)
                );
                CREATE TABLE IF NOT EXISTS doente_telefones (
                    id TEXT PRIMARY KEY,
                    doente_id TEXT NOT NULL,
                    numero TEXT NOT NULL,
                    rotulo TEXT,
                    criado_em TEXT NOT NULL,
                    FOREIGN KEY (doente_id) REFERENCES doentes (id)
                );
                CREATE TABLE IF NOT EXISTS agendamentos (
                    id TEXT PRIMARY KEY,
                    doente_id TEXT NOT NULL,
                    ministro_primario TEXT NOT NULL,
                    ministro_secundario TEXT,
                    data TEXT NOT NULL,
                    hora TEXT,
                    status TEXT NOT NULL,
                    observacoes TEXT,
                    criado_em TEXT NOT NULL,
                    FOREIGN KEY (doente_id) REFERENCES doentes (id),
                    FOREIGN KEY (ministro_primario) REFERENCES ministros (id),
                    FOREIGN KEY (ministro_secundario) REFERENCES ministros (id)
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_visita_ativa
                    ON agendamentos (doente_id) WHERE status = 'agendado';
                COMMIT;",
            )?;

            let total: i64 = conn.query_row("SELECT COUNT(*) FROM ministros", [], |row| row.get(0))?;
            if total > 0 {
                return Ok(false);
            }

            let senha_hash = bcrypt::hash("pastoral", bcrypt::DEFAULT_COST).unwrap();
            conn.execute(
                "INSERT INTO ministros (id, nome, email, telefone, funcao, senha_hash, codigo_acesso, desativado, criado_em)
                 VALUES (?1, ?2, ?3, '', 'admin', ?4, ?5, 0, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    "Administrador",
                    EMAIL_ADMIN_INICIAL,
                    senha_hash,
                    CODIGO_ADMIN_INICIAL,
                    Local::now(),
                ],
            )?;
            Ok(true)
        })
        .await?;

    if semeado {
        println!(
            "✅ Base de dados inicializada. Administrador inicial: {} (código {}).",
            EMAIL_ADMIN_INICIAL, CODIGO_ADMIN_INICIAL
        );
    }
    Ok(())
}
