//! Code generators behind `create-endpoint`, `create-model` and `makemigrations`.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tracing::info;

#[derive(Debug, ThisError)]
pub enum ScaffoldError {
    #[error("`{0}` is not a valid Rust identifier")]
    InvalidName(String),

    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "gen", "try",
];

fn validate_ident(name: &str) -> Result<(), ScaffoldError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name != "_"
        }
        None => false,
    };
    if !valid || KEYWORDS.contains(&name) {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `BlogPost` -> `blog_post`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Lowercase words joined by `_`, for migration file names.
fn slugify(message: &str) -> String {
    let slug = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "migration".to_string()
    } else {
        slug
    }
}

/// Write `contents` to a file that must not exist yet, creating parent directories.
fn write_new(path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ScaffoldError::AlreadyExists(path.to_path_buf()),
            _ => ScaffoldError::Io(e),
        })?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

/// Timestamp version for a new migration, bumped past any version already in `dir`.
fn next_version(dir: &Path) -> Result<i64, ScaffoldError> {
    let now: i64 = Utc::now()
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or_default();

    let mut latest = None;
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            let version = name
                .to_str()
                .and_then(|n| n.split_once('_'))
                .and_then(|(v, _)| v.parse::<i64>().ok());
            latest = latest.max(version);
        }
    }

    Ok(match latest {
        Some(v) if v >= now => v + 1,
        _ => now,
    })
}

fn endpoint_template(name: &str, handler: &str) -> String {
    format!(
        r#"use axum::{{Json, Router, routing::get}};
use serde_json::{{Value, json}};

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{{
    Router::new().route("/{handler}", get(get_{handler}))
}}

pub async fn get_{handler}() -> Json<Value> {{
    Json(json!({{ "message": "{name} endpoint working" }}))
}}
"#
    )
}

fn model_template(name: &str, table: &str) -> String {
    format!(
        r#"use serde::{{Deserialize, Serialize}};
use sqlx::FromRow;

/// Row of the `{table}` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct {name} {{
    pub id: i64,
    pub name: Option<String>,
}}
"#
    )
}

/// `table` is quoted so reserved words like `order` stay usable.
fn create_table_template(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    name TEXT\n);\n"
    )
}

/// Write an axum handler stub `<dir>/<name>.rs`.
pub fn create_endpoint(name: &str, dir: &Path) -> Result<PathBuf, ScaffoldError> {
    validate_ident(name)?;
    let module = to_snake_case(name);
    let path = dir.join(format!("{module}.rs"));

    write_new(&path, &endpoint_template(name, &module))?;
    info!(path = %path.display(), "Endpoint {} created", name);
    Ok(path)
}

/// Write a `FromRow` struct stub and the migration creating its table.
///
/// Returns the model path and the migration path.
pub fn create_model(
    name: &str,
    models_dir: &Path,
    migrations_dir: &Path,
) -> Result<(PathBuf, PathBuf), ScaffoldError> {
    validate_ident(name)?;
    let table = name.to_ascii_lowercase();
    let model_path = models_dir.join(format!("{}.rs", to_snake_case(name)));
    if model_path.exists() {
        return Err(ScaffoldError::AlreadyExists(model_path));
    }

    let migration_path = migrations_dir.join(format!(
        "{}_create_{table}.sql",
        next_version(migrations_dir)?
    ));

    write_new(&model_path, &model_template(name, &table))?;
    write_new(&migration_path, &create_table_template(&table))?;
    info!(
        model = %model_path.display(),
        migration = %migration_path.display(),
        "Model {} created",
        name
    );
    Ok((model_path, migration_path))
}

/// Create an empty, timestamped migration file.
pub fn create_migration(message: &str, dir: &Path) -> Result<PathBuf, ScaffoldError> {
    let path = dir.join(format!("{}_{}.sql", next_version(dir)?, slugify(message)));
    write_new(&path, &format!("-- {message}\n"))?;
    info!(path = %path.display(), "Migration created");
    Ok(path)
}
