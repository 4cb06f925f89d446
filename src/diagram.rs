//! Schema diagrams: SQLite introspection, Mermaid ER and PlantUML class output,
//! and rendering through the external `mmdc` / PlantUML tools.

use futures::StreamExt;
use sqlx::{FromRow, SqlitePool};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

pub const PLANTUML_JAR_URL: &str =
    "https://github.com/plantuml/plantuml/releases/latest/download/plantuml.jar";

#[derive(Debug, ThisError)]
pub enum DiagramError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("`{0}` is not installed or not on PATH")]
    ToolMissing(&'static str),

    #[error("`{tool}` exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("download failed with status {0}")]
    DownloadStatus(reqwest::StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Column {
    pub name: String,
    #[sqlx(rename = "type")]
    pub ty: String,
    #[sqlx(rename = "notnull")]
    pub not_null: bool,
    /// 1-based position in the primary key, 0 when not part of it.
    pub pk: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ForeignKey {
    #[sqlx(rename = "from")]
    pub column: String,
    #[sqlx(rename = "table")]
    pub ref_table: String,
    #[sqlx(rename = "to")]
    pub ref_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    fn is_fk(&self, column: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.column == column)
    }
}

/// Read user tables, their columns and foreign keys from a live SQLite database.
pub async fn introspect(pool: &SqlitePool) -> Result<Vec<Table>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
    SELECT name FROM sqlite_master
    WHERE type = 'table'
      AND name NOT LIKE 'sqlite_%'
      AND name <> '_sqlx_migrations'
    ORDER BY name
    "#,
    )
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = sqlx::query_as::<_, Column>(
            r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(&name)
        .fetch_all(pool)
        .await?;

        let foreign_keys = sqlx::query_as::<_, ForeignKey>(
            r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
        )
        .bind(&name)
        .fetch_all(pool)
        .await?;

        tables.push(Table {
            name,
            columns,
            foreign_keys,
        });
    }
    Ok(tables)
}

/// Mermaid attribute types must be single words.
fn type_word(ty: &str) -> String {
    let word: String = ty
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let word = word.trim_matches('_');
    if word.is_empty() {
        "ANY".to_string()
    } else {
        word.to_string()
    }
}

/// Mermaid `erDiagram` source for `tables`.
pub fn mermaid_erd(tables: &[Table]) -> String {
    let mut out = String::from("erDiagram\n");
    for table in tables {
        let _ = writeln!(out, "    {} {{", table.name);
        for col in &table.columns {
            let mut keys = Vec::new();
            if col.pk > 0 {
                keys.push("PK");
            }
            if table.is_fk(&col.name) {
                keys.push("FK");
            }
            let _ = write!(out, "        {} {}", type_word(&col.ty), col.name);
            if !keys.is_empty() {
                let _ = write!(out, " {}", keys.join(", "));
            }
            out.push('\n');
        }
        out.push_str("    }\n");
    }
    for table in tables {
        for fk in &table.foreign_keys {
            let _ = writeln!(
                out,
                "    {} ||--o{{ {} : \"{}\"",
                fk.ref_table, table.name, fk.column
            );
        }
    }
    out
}

/// PlantUML class diagram source for `tables`.
pub fn plantuml_classes(tables: &[Table]) -> String {
    let mut out = String::from("@startuml\nhide methods\n");
    for table in tables {
        let _ = writeln!(out, "class {} {{", table.name);
        for col in &table.columns {
            let marker = if col.pk > 0 { "+" } else { "" };
            let nullable = if col.not_null || col.pk > 0 { "" } else { "?" };
            let _ = writeln!(out, "  {marker}{} : {}{nullable}", col.name, type_word(&col.ty));
        }
        out.push_str("}\n");
    }
    for table in tables {
        for fk in &table.foreign_keys {
            let _ = writeln!(
                out,
                "{} \"1\" -- \"*\" {} : {}",
                fk.ref_table, table.name, fk.column
            );
        }
    }
    out.push_str("@enduml\n");
    out
}

async fn run_tool(tool: &'static str, args: &[&str]) -> Result<(), DiagramError> {
    let status = Command::new(tool).args(args).status().await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            DiagramError::ToolMissing(tool)
        } else {
            DiagramError::Io(e)
        }
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(DiagramError::ToolFailed { tool, status })
    }
}

/// Render a Mermaid file to an image with `mmdc`.
pub async fn render_mermaid(input: &Path, output: &Path) -> Result<(), DiagramError> {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();
    run_tool("mmdc", &["-i", &input, "-o", &output]).await?;
    info!(output = %output, "Mermaid diagram rendered");
    Ok(())
}

/// Output extensions `mmdc` can produce.
pub fn is_image_output(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("png" | "svg" | "pdf")
    )
}

/// Download the PlantUML jar to `dest` unless it is already there.
pub async fn ensure_plantuml_jar(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<PathBuf, DiagramError> {
    if tokio::fs::try_exists(dest).await? {
        return Ok(dest.to_path_buf());
    }

    warn!(path = %dest.display(), "PlantUML jar not found, downloading");
    let resp = http.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(DiagramError::DownloadStatus(resp.status()));
    }

    let total = resp.content_length();
    // Write under a temporary name so an interrupted download leaves no truncated jar.
    let partial = dest.with_extension("jar.part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    let mut last_decile = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(total) = total.filter(|t| *t > 0) {
            let decile = written * 10 / total;
            if decile > last_decile {
                last_decile = decile;
                info!("PlantUML download {}%", decile * 10);
            }
        }
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;

    info!(bytes = written, path = %dest.display(), "Downloaded plantuml.jar");
    Ok(dest.to_path_buf())
}

/// Render a PlantUML file with `java -jar <jar>`, fetching the jar when missing.
pub async fn render_plantuml(
    http: &reqwest::Client,
    input: &Path,
    jar: &Path,
) -> Result<(), DiagramError> {
    run_tool("java", &["-version"]).await?;
    let jar = ensure_plantuml_jar(http, PLANTUML_JAR_URL, jar).await?;

    let jar = jar.to_string_lossy();
    let input = input.to_string_lossy();
    run_tool("java", &["-jar", &jar, &input]).await?;
    info!(input = %input, "Class diagram rendered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Table> {
        vec![
            Table {
                name: "items".into(),
                columns: vec![
                    Column {
                        name: "id".into(),
                        ty: "INTEGER".into(),
                        not_null: false,
                        pk: 1,
                    },
                    Column {
                        name: "owner_id".into(),
                        ty: "INTEGER".into(),
                        not_null: true,
                        pk: 0,
                    },
                ],
                foreign_keys: vec![ForeignKey {
                    column: "owner_id".into(),
                    ref_table: "users".into(),
                    ref_column: "id".into(),
                }],
            },
            Table {
                name: "users".into(),
                columns: vec![Column {
                    name: "email".into(),
                    ty: "VARCHAR(255)".into(),
                    not_null: true,
                    pk: 0,
                }],
                foreign_keys: Vec::new(),
            },
        ]
    }

    #[test]
    fn mermaid_marks_keys_and_relations() {
        let src = mermaid_erd(&sample());
        assert!(src.starts_with("erDiagram\n"));
        assert!(src.contains("        INTEGER id PK\n"));
        assert!(src.contains("        INTEGER owner_id FK\n"));
        assert!(src.contains("        VARCHAR_255 email\n"));
        assert!(src.contains(r#"    users ||--o{ items : "owner_id""#));
    }

    #[test]
    fn plantuml_lists_classes_and_links() {
        let src = plantuml_classes(&sample());
        assert!(src.starts_with("@startuml\n"));
        assert!(src.trim_end().ends_with("@enduml"));
        assert!(src.contains("class users {"));
        assert!(src.contains("  +id : INTEGER\n"));
        assert!(src.contains(r#"users "1" -- "*" items : owner_id"#));
    }

    #[test]
    fn image_outputs_are_detected() {
        assert!(is_image_output(Path::new("erd.png")));
        assert!(is_image_output(Path::new("out/erd.svg")));
        assert!(!is_image_output(Path::new("schema_erd.mmd")));
        assert!(!is_image_output(Path::new("noext")));
    }
}
