use rusqlite::{params, Connection, OptionalExtension};

use super::bool_at;
use crate::db::now_timestamp;
use crate::models::Term;

const TERM_COLUMNS: &str = "t.id, t.kind, t.title, t.content, t.version, t.is_required, t.is_active";

fn parse_term_row(row: &rusqlite::Row) -> rusqlite::Result<Term> {
    Ok(Term {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        version: row.get(4)?,
        is_required: bool_at(row, 5)?,
        is_active: bool_at(row, 6)?,
    })
}

pub fn list_active_terms(conn: &Connection) -> anyhow::Result<Vec<Term>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TERM_COLUMNS} FROM terms t WHERE t.is_active = 1 ORDER BY t.is_required DESC, t.created_at ASC"
    ))?;
    let rows = stmt.query_map([], parse_term_row)?;

    let mut terms = vec![];
    for row in rows {
        terms.push(row?);
    }
    Ok(terms)
}

pub fn get_term(conn: &Connection, id: &str) -> anyhow::Result<Option<Term>> {
    let term = conn
        .query_row(
            &format!("SELECT {TERM_COLUMNS} FROM terms t WHERE t.id = ?1"),
            params![id],
            parse_term_row,
        )
        .optional()?;
    Ok(term)
}

pub fn insert_term(conn: &Connection, term: &Term) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO terms (id, kind, title, content, version, is_required, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            term.id,
            term.kind,
            term.title,
            term.content,
            term.version,
            term.is_required as i32,
            term.is_active as i32,
        ],
    )?;
    Ok(())
}

/// A newer version of the same kind supersedes the active one.
pub fn deactivate_terms_of_kind(conn: &Connection, kind: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE terms SET is_active = 0 WHERE kind = ?1 AND is_active = 1",
        params![kind],
    )?;
    Ok(count)
}

pub fn record_agreement(conn: &Connection, user_id: &str, term_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO term_agreements (user_id, term_id, agreed_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, term_id) DO NOTHING",
        params![user_id, term_id, now_timestamp()],
    )?;
    Ok(())
}

pub fn list_missing_required_terms(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Term>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TERM_COLUMNS} FROM terms t
         WHERE t.is_active = 1 AND t.is_required = 1
           AND NOT EXISTS (
             SELECT 1 FROM term_agreements a WHERE a.term_id = t.id AND a.user_id = ?1
           )
         ORDER BY t.created_at ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_term_row)?;

    let mut terms = vec![];
    for row in rows {
        terms.push(row?);
    }
    Ok(terms)
}
