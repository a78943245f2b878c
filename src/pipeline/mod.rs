//! The extraction pipeline: records in, [`Dataset`] out.
//!
//! ```text
//! RawRecord ─parse─▶ ParsedMessage ─sanitize─▶ CleanedMessage
//!     ─partition─▶ outbound ─dedup─▶ match against inbound index
//!     ─filter─▶ Dataset { pairs, unresolved, stats }
//! ```
//!
//! Everything runs in memory on one thread. A record that fails to parse is
//! logged, counted and skipped; it never aborts the run.

pub mod assembler;
pub mod matcher;

use std::path::Path;

use tracing::{info, warn};

use crate::clean;
use crate::config::Config;
use crate::error::Result;
use crate::filter::{ContentFilter, FilterConfig};
use crate::model::message::{CleanedMessage, RawRecord};
use crate::model::pair::{Dataset, DatasetStats};
use crate::parser::mbox::MboxReader;
use crate::parser::RecordParser;

pub use assembler::{dedup_outbound, PairAssembler};
pub use matcher::{partition, ConversationMatcher, InboundIndex};

/// A configured pipeline for one mailbox owner.
#[derive(Debug, Clone)]
pub struct Pipeline {
    parser: RecordParser,
    filter: ContentFilter,
}

impl Pipeline {
    /// Build a pipeline; fails on a bad owner address or an invalid pattern.
    pub fn new(owner_address: &str, filter: &FilterConfig) -> Result<Self> {
        Ok(Self {
            parser: RecordParser::new(owner_address)?,
            filter: ContentFilter::new(filter)?,
        })
    }

    /// Validate `config` and build a pipeline from it.
    ///
    /// `owner` overrides `[general] owner_address`.
    pub fn from_config(config: &Config, owner: Option<&str>) -> Result<Self> {
        let owner = config.validate(owner)?;
        Self::new(owner, &config.filter)
    }

    pub fn owner(&self) -> &str {
        self.parser.owner()
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    /// Run over records that were already split out of their container.
    pub fn run(&self, records: impl IntoIterator<Item = RawRecord>) -> Dataset {
        let mut stats = DatasetStats::default();
        let mut cleaned = Vec::new();

        for record in records {
            stats.total_records += 1;
            match self.parser.parse(&record) {
                Ok(message) => {
                    stats.total_parsed += 1;
                    let clean_body_text = clean::sanitize(&message.raw_body_text);
                    cleaned.push(CleanedMessage {
                        message,
                        clean_body_text,
                    });
                }
                Err(e) => {
                    warn!(offset = record.offset, error = %e, "Skipping unparseable message");
                    stats.parse_failures += 1;
                }
            }
        }

        let (outbound, inbound) = matcher::partition(cleaned);
        stats.outbound = outbound.len() as u64;
        stats.inbound = inbound.len() as u64;

        let (outbound, duplicates) = assembler::dedup_outbound(outbound);
        stats.duplicates_removed = duplicates;

        let matcher = ConversationMatcher::new(InboundIndex::build(inbound, &self.filter));
        stats.inbound_duplicates = matcher.index().duplicates();
        stats.inbound_filtered_by_reason = matcher.index().filtered().clone();

        let outcomes = outbound.into_iter().map(|m| matcher.resolve(m));
        let dataset = PairAssembler::new(&self.filter).assemble(outcomes, stats);

        info!(
            parsed = dataset.stats.total_parsed,
            failures = dataset.stats.parse_failures,
            pairs = dataset.pairs.len(),
            unresolved = dataset.unresolved.len(),
            duplicates = dataset.stats.duplicates_removed,
            dropped = dataset.stats.dropped_total(),
            inbound_filtered = dataset.stats.inbound_filtered_total(),
            "Pipeline finished"
        );
        dataset
    }

    /// Split an MBOX file and run over every record in it.
    ///
    /// `progress` receives `(bytes_read, file_size)` while the file is split.
    pub fn run_mbox(&self, path: &Path, progress: Option<&dyn Fn(u64, u64)>) -> Result<Dataset> {
        let reader = MboxReader::open(path)?;
        info!(path = %path.display(), size = reader.file_size(), "Reading MBOX");
        let records = reader.read_all(progress)?;
        Ok(self.run(records))
    }
}
