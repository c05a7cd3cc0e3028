use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::terms::TERM_KINDS;
use crate::models::Term;

/// Records agreement to each term. Agreeing twice is harmless.
pub fn agree(conn: &Connection, user_id: &str, term_ids: &[String]) -> Result<Vec<Term>, AppError> {
    if term_ids.is_empty() {
        return Err(AppError::validation("동의할 약관을 선택해주세요"));
    }

    for id in term_ids {
        queries::get_term(conn, id)?
            .filter(|t| t.is_active)
            .ok_or_else(|| AppError::not_found("약관을 찾을 수 없습니다"))?;
        queries::record_agreement(conn, user_id, id)?;
    }

    Ok(queries::list_missing_required_terms(conn, user_id)?)
}

#[derive(Debug, Deserialize)]
pub struct TermInput {
    pub kind: String,
    pub title: String,
    pub content: String,
    pub version: String,
    #[serde(default = "default_true")]
    pub is_required: bool,
}

fn default_true() -> bool {
    true
}

/// Publishes a term; it replaces the active version of the same kind.
pub fn create_term(conn: &Connection, input: TermInput) -> Result<Term, AppError> {
    if !TERM_KINDS.contains(&input.kind.as_str()) {
        return Err(AppError::validation(format!(
            "약관 종류는 {} 중 하나여야 합니다",
            TERM_KINDS.join(", ")
        )));
    }
    if input.title.trim().is_empty() || input.content.trim().is_empty() || input.version.trim().is_empty() {
        return Err(AppError::validation("제목, 내용, 버전을 모두 입력해주세요"));
    }

    let term = Term {
        id: new_id(),
        kind: input.kind,
        title: input.title.trim().to_string(),
        content: input.content,
        version: input.version.trim().to_string(),
        is_required: input.is_required,
        is_active: true,
    };
    queries::deactivate_terms_of_kind(conn, &term.kind)?;
    queries::insert_term(conn, &term)?;
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn input(kind: &str, version: &str, required: bool) -> TermInput {
        TermInput {
            kind: kind.to_string(),
            title: format!("{kind} 약관"),
            content: "내용".to_string(),
            version: version.to_string(),
            is_required: required,
        }
    }

    #[test]
    fn agreement_clears_missing_required() {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        let service = create_term(&conn, input("service", "1.0", true)).unwrap();
        let privacy = create_term(&conn, input("privacy", "1.0", true)).unwrap();
        create_term(&conn, input("marketing", "1.0", false)).unwrap();

        assert_eq!(queries::list_missing_required_terms(&conn, &user.id).unwrap().len(), 2);

        let missing = agree(&conn, &user.id, &[service.id.clone()]).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, privacy.id);

        let missing = agree(&conn, &user.id, &[service.id, privacy.id]).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn new_version_supersedes_old() {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        let v1 = create_term(&conn, input("service", "1.0", true)).unwrap();
        agree(&conn, &user.id, &[v1.id.clone()]).unwrap();

        let v2 = create_term(&conn, input("service", "2.0", true)).unwrap();
        let missing = queries::list_missing_required_terms(&conn, &user.id).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, v2.id);

        assert!(matches!(agree(&conn, &user.id, &[v1.id]), Err(AppError::NotFound(_))));
        assert!(matches!(create_term(&conn, input("cookies", "1.0", true)), Err(AppError::Validation(_))));
    }
}
