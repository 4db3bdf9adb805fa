use crate::areas::store::IndexStore;
use crate::artifacts::graph_index::OpenOptions;
use anyhow::anyhow;

impl IndexStore {
    /// Verify the checksum and walk every table of the index
    ///
    /// Always hashes the file, whatever the store's open options say.
    pub fn verify(&self) -> anyhow::Result<()> {
        let index = OpenOptions::default().open_path(self.path())?;

        let mut previous = None;
        for id in index.ids() {
            let id = id?;
            if previous.is_some_and(|previous| previous >= id) {
                return Err(anyhow!("commit ids are not strictly ascending at {id}"));
            }
            previous = Some(id);
        }

        let stats = index.filter_stats()?;
        writeln!(
            self.writer(),
            "ok: {} commits, {} filters, {} bloom words",
            stats.commits,
            stats.filters,
            stats.bloom_words
        )?;

        Ok(())
    }
}
