use crate::core::score::OffTargetResult;
use crate::core::types::Strand;
use crate::offtarget::{
    evaluate_window, HitCollector, OffTargetConfig, OffTargetQuery, OffTargetSearcher,
    ReferenceCorpus, SearchBudget, SearchStrategy, StrandPatterns, BUDGET_CHECK_INTERVAL,
};

/// Exhaustive window-by-window search
pub struct DirectScan<'a> {
    corpus: &'a ReferenceCorpus,
}

impl<'a> DirectScan<'a> {
    #[must_use]
    pub fn new(corpus: &'a ReferenceCorpus) -> Self {
        Self { corpus }
    }
}

impl OffTargetSearcher for DirectScan<'_> {
    fn search(
        &self,
        query: &OffTargetQuery<'_>,
        config: &OffTargetConfig,
        budget: &SearchBudget,
    ) -> OffTargetResult {
        let patterns = StrandPatterns::new(query.guide);
        let len = query.guide.len();
        let mut collector = HitCollector::new(config.max_hits);
        let mut examined = 0usize;

        if len == 0 {
            return collector.finish(None);
        }

        for (sequence_index, sequence) in self.corpus.sequences.iter().enumerate() {
            if sequence.len() < len {
                continue;
            }

            for position in 0..=sequence.len() - len {
                examined += 1;
                if examined % BUDGET_CHECK_INTERVAL == 0 {
                    if let Some(status) = budget.exhausted() {
                        return collector.finish(Some(status));
                    }
                }

                for strand in [Strand::Forward, Strand::Reverse] {
                    let hit = evaluate_window(
                        query,
                        config,
                        self.corpus,
                        sequence_index,
                        position,
                        strand,
                        patterns.for_strand(strand),
                    );
                    if let Some(hit) = hit {
                        if !collector.offer(hit) {
                            return collector.finish(None);
                        }
                    }
                }
            }
        }

        collector.finish(None)
    }

    fn corpus(&self) -> &ReferenceCorpus {
        self.corpus
    }

    fn strategy(&self, _guide_len: usize, _max_mismatches: usize) -> SearchStrategy {
        SearchStrategy::DirectScan
    }
}
