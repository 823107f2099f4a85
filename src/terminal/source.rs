// ABOUTME: Sources for the local terminal geometry.
// ABOUTME: Reads the size from the tty, process environment, or an environment directory.

use super::TerminalGeometry;
use async_trait::async_trait;
use std::path::PathBuf;

/// Where the current terminal size comes from.
#[async_trait]
pub trait GeometrySource: Send + Sync {
    /// Current geometry, or `None` if the source has nothing to report.
    async fn geometry(&self) -> Option<TerminalGeometry>;
}

/// Reads the size of the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyGeometry;

#[async_trait]
impl GeometrySource for TtyGeometry {
    async fn geometry(&self) -> Option<TerminalGeometry> {
        match crossterm::terminal::window_size() {
            Ok(size) => Some(
                TerminalGeometry::new(size.columns.into(), size.rows.into())
                    .with_pixels(size.width.into(), size.height.into()),
            ),
            Err(e) => {
                tracing::debug!("cannot read terminal size: {}", e);
                None
            }
        }
    }
}

/// Reads `LINES` and `COLS` (or `COLUMNS`) from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

#[async_trait]
impl GeometrySource for ProcessEnv {
    async fn geometry(&self) -> Option<TerminalGeometry> {
        let rows = std::env::var("LINES").ok();
        let columns = std::env::var("COLS")
            .ok()
            .or_else(|| std::env::var("COLUMNS").ok());
        from_values(columns.as_deref(), rows.as_deref())
    }
}

/// Reads `LINES` and `COLS` from files in an environment directory.
///
/// This is the filesystem-backed environment where each variable is a file
/// whose content is the value, so updates are visible while we run.
#[derive(Debug, Clone)]
pub struct EnvDir {
    dir: PathBuf,
}

impl EnvDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, name: &str) -> Option<String> {
        tokio::fs::read_to_string(self.dir.join(name)).await.ok()
    }
}

#[async_trait]
impl GeometrySource for EnvDir {
    async fn geometry(&self) -> Option<TerminalGeometry> {
        let rows = self.read("LINES").await;
        let columns = self.read("COLS").await;
        from_values(columns.as_deref(), rows.as_deref())
    }
}

/// Unparseable values count as zero. Nothing set at all is `None`.
fn from_values(columns: Option<&str>, rows: Option<&str>) -> Option<TerminalGeometry> {
    if columns.is_none() && rows.is_none() {
        return None;
    }
    Some(TerminalGeometry::new(
        columns.map(to_number).unwrap_or(0),
        rows.map(to_number).unwrap_or(0),
    ))
}

fn to_number(value: &str) -> u32 {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_number_trims_padding() {
        assert_eq!(to_number("80\n"), 80);
        assert_eq!(to_number(" 24\0"), 24);
        assert_eq!(to_number("wide"), 0);
    }

    #[test]
    fn from_values_requires_at_least_one() {
        assert_eq!(from_values(None, None), None);
        assert_eq!(
            from_values(Some("100"), None),
            Some(TerminalGeometry::new(100, 0))
        );
    }
}
