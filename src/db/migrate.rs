use sqlx::SqlitePool;
use sqlx::migrate::{MigrateError, Migrator};
use std::path::Path;
use tracing::info;

/// Apply every pending `<version>_<description>.sql` file found in `dir`.
///
/// Returns the number of migrations the directory holds. Already applied
/// migrations are skipped by the migrator's bookkeeping table.
pub async fn run_migrations(pool: &SqlitePool, dir: &Path) -> Result<usize, MigrateError> {
    let migrator = Migrator::new(dir).await?;
    let known = migrator.iter().count();
    migrator.run(pool).await?;
    info!(dir = %dir.display(), migrations = known, "Migrations applied");
    Ok(known)
}
