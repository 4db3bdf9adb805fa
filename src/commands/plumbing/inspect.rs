use crate::areas::store::IndexStore;
use crate::artifacts::graph_index::CHUNK_NAMES;

impl IndexStore {
    pub fn inspect(&self) -> anyhow::Result<()> {
        let index = self.open()?;
        let header = index.header();
        let params = index.bloom_params();
        let stats = index.filter_stats()?;
        let mut writer = self.writer();

        writeln!(writer, "version:        {}", header.version())?;
        writeln!(writer, "chunks:         {}", header.chunk_count())?;
        for entry in index.chunk_table() {
            let signature = entry.signature_str();
            let name = CHUNK_NAMES.get(signature.as_str()).copied().unwrap_or("unknown");
            writeln!(writer, "  {signature} {:>10}  {name}", entry.offset)?;
        }
        writeln!(writer, "commits:        {}", stats.commits)?;
        writeln!(writer, "filters:        {}", stats.filters)?;
        writeln!(writer, "bloom words:    {}", stats.bloom_words)?;
        writeln!(writer, "hash functions: {}", params.num_hashes)?;
        writeln!(writer, "bits per entry: {}", params.bits_per_entry)?;

        Ok(())
    }
}
