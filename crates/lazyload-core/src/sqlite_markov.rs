use std::collections::HashMap;

use rusqlite::params;

use crate::sqlite::SqliteIndexStore;
use crate::types::{ChainKind, ChainStats, StoreError, Transition};

impl SqliteIndexStore {
    pub(crate) fn markov_chain_id(&self, chain: ChainKind) -> Option<i64> {
        self.conn
            .query_row(
                "SELECT id FROM markov_chains WHERE chain_type = ?1",
                params![chain.as_str()],
                |row| row.get(0),
            )
            .ok()
    }

    /// Replace a chain's transition table atomically. Raw counts are
    /// normalized so that probabilities over each from-state sum to 1.
    pub(crate) fn markov_rebuild_chain(
        &mut self,
        chain: ChainKind,
        transitions: &[(String, String, u32)],
    ) -> Result<(), StoreError> {
        // Sum raw counts per from-state for normalization.
        let mut totals: HashMap<&str, u64> = HashMap::new();
        for (from, _, count) in transitions {
            *totals.entry(from.as_str()).or_default() += u64::from(*count);
        }

        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM markov_chains WHERE chain_type = ?1",
            params![chain.as_str()],
        )?;
        tx.execute(
            "INSERT INTO markov_chains (chain_type) VALUES (?1)",
            params![chain.as_str()],
        )?;
        let chain_id = tx.last_insert_rowid();

        {
            let mut state_stmt = tx.prepare(
                "INSERT OR IGNORE INTO markov_states (chain_id, state) VALUES (?1, ?2)",
            )?;
            let mut transition_stmt = tx.prepare(
                "INSERT INTO markov_transitions (chain_id, from_state, to_state, raw_count, probability)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(chain_id, from_state, to_state) DO UPDATE SET
                    raw_count = raw_count + excluded.raw_count,
                    probability = probability + excluded.probability",
            )?;
            for (from, to, count) in transitions {
                if *count == 0 {
                    continue;
                }
                let total = totals.get(from.as_str()).copied().unwrap_or(1).max(1);
                let probability = f64::from(*count) / total as f64;
                state_stmt.execute(params![chain_id, from])?;
                state_stmt.execute(params![chain_id, to])?;
                transition_stmt.execute(params![chain_id, from, to, count, probability])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub(crate) fn markov_transitions(&self, chain: ChainKind, from_state: &str) -> Vec<Transition> {
        let Some(chain_id) = self.markov_chain_id(chain) else {
            return Vec::new();
        };
        let mut stmt = match self.conn.prepare(
            "SELECT from_state, to_state, raw_count, probability FROM markov_transitions
             WHERE chain_id = ?1 AND from_state = ?2
             ORDER BY probability DESC, to_state",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] markov_transitions: prepare failed: {e}");
                return Vec::new();
            }
        };
        let result = match stmt.query_map(params![chain_id, from_state], |row| {
            Ok(Transition {
                chain_id,
                from_state: row.get(0)?,
                to_state: row.get(1)?,
                raw_count: row.get(2)?,
                probability: row.get(3)?,
            })
        }) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] markov_transitions: query failed: {e}");
                Vec::new()
            }
        };
        result
    }

    pub(crate) fn markov_has_support(&self, chain: ChainKind, state: &str) -> bool {
        let Some(chain_id) = self.markov_chain_id(chain) else {
            return false;
        };
        self.conn
            .query_row(
                "SELECT 1 FROM markov_transitions WHERE chain_id = ?1 AND from_state = ?2 LIMIT 1",
                params![chain_id, state],
                |_| Ok(()),
            )
            .is_ok()
    }

    pub(crate) fn markov_all_stats(&self) -> Vec<ChainStats> {
        let mut stats = Vec::new();
        for chain in ChainKind::ALL {
            let Some(chain_id) = self.markov_chain_id(chain) else {
                continue;
            };
            let state_count = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM markov_states WHERE chain_id = ?1",
                    params![chain_id],
                    |row| row.get(0),
                )
                .unwrap_or(0);
            let transition_count = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM markov_transitions WHERE chain_id = ?1",
                    params![chain_id],
                    |row| row.get(0),
                )
                .unwrap_or(0);
            stats.push(ChainStats {
                chain,
                state_count,
                transition_count,
            });
        }
        stats
    }
}
