use crate::areas::store::IndexStore;

impl IndexStore {
    pub fn ids(&self, abbrev: bool) -> anyhow::Result<()> {
        let index = self.open()?;

        for id in index.ids() {
            let id = id?;
            if abbrev {
                writeln!(self.writer(), "{}", id.to_short_id())?;
            } else {
                writeln!(self.writer(), "{id}")?;
            }
        }

        Ok(())
    }
}
