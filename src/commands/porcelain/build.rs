use crate::areas::store::IndexStore;
use crate::artifacts::bloom::BloomSettings;
use crate::artifacts::graph_index::{Encoder, MemoryIndex};
use crate::artifacts::log::manifest::ManifestReader;
use std::io::BufRead;

impl IndexStore {
    /// Build an index from a changed-path manifest and publish it
    pub fn build(&self, manifest: impl BufRead, settings: BloomSettings) -> anyhow::Result<()> {
        let mut index = MemoryIndex::new();

        for commit in ManifestReader::new(manifest)? {
            let commit = commit?;
            index.record(commit.id, &commit.paths, &settings)?;
        }

        let summary = self.write_index(&index, &Encoder::new(settings)?)?;

        writeln!(
            self.writer(),
            "Wrote {} commits ({} with filters, {} bytes) to {}",
            summary.commits,
            summary.filters,
            summary.bytes_written,
            self.path().display()
        )?;

        Ok(())
    }
}
