use crate::areas::store::IndexStore;
use crate::artifacts::objects::commit_id::CommitId;
use colored::Colorize;

impl IndexStore {
    /// Report, per path, whether `commit` may have changed it
    ///
    /// `no` is definite. `maybe` needs confirming with a real diff, as does
    /// every path of a commit without a filter.
    pub fn lookup(&self, commit: &str, paths: &[String]) -> anyhow::Result<()> {
        let id = CommitId::try_parse(commit)?;
        let index = self.open()?;

        match index.find(&id)? {
            None => {
                let reason = match index.position(&id)? {
                    Some(_) => "commit has no filter",
                    None => "commit not in index",
                };
                writeln!(self.writer(), "{}: {}", id.to_short_id(), reason.yellow())?;
            }
            Some(filter) => {
                for path in paths {
                    let path = path.trim_matches('/');
                    let answer = match filter.test(path) {
                        true => "maybe".green(),
                        false => "no".red(),
                    };
                    writeln!(self.writer(), "{answer}\t{path}")?;
                }
            }
        }

        Ok(())
    }
}
