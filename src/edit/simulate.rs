use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::sequence::reverse_complement;
use crate::core::types::Strand;
use crate::edit::translate::{first_stop, translate};
use crate::edit::EditError;

/// Largest indel size in the indel scan
pub const MAX_SCAN_INDEL: usize = 3;

/// A sequence change applied at a cut site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Remove this many bases starting at the cut
    Deletion(usize),
    /// Insert these bases at the cut
    Insertion(String),
    /// Replace the base at the cut
    Substitution { from: char, to: char },
}

impl EditKind {
    /// Change in sequence length caused by this edit
    #[must_use]
    pub fn length_change(&self) -> isize {
        match self {
            Self::Deletion(n) => isize::try_from(*n).map_or(isize::MIN, |n| -n),
            Self::Insertion(bases) => isize::try_from(bases.len()).unwrap_or(isize::MAX),
            Self::Substitution { .. } => 0,
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deletion(n) => write!(f, "del{n}"),
            Self::Insertion(bases) => write!(f, "ins-{}", bases.to_ascii_lowercase()),
            Self::Substitution { from, to } => write!(f, "sub:{from}>{to}"),
        }
    }
}

fn is_acgt(c: char) -> bool {
    matches!(c, 'A' | 'C' | 'G' | 'T')
}

impl FromStr for EditKind {
    type Err = EditError;

    /// Accepts `del<N>`, `ins-<BASES>` (or `ins<BASES>`) and `sub:<FROM>><TO>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let invalid = || EditError::InvalidEdit(s.to_string());

        if let Some(n) = lower.strip_prefix("del") {
            let n: usize = n.parse().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            return Ok(Self::Deletion(n));
        }

        if let Some(rest) = lower.strip_prefix("ins") {
            let bases = rest.trim_start_matches('-').to_ascii_uppercase();
            if bases.is_empty() || !bases.chars().all(is_acgt) {
                return Err(invalid());
            }
            return Ok(Self::Insertion(bases));
        }

        if let Some(rest) = lower.strip_prefix("sub:") {
            let upper = rest.to_ascii_uppercase();
            let mut chars = upper.chars();
            if let (Some(from), Some('>'), Some(to), None) =
                (chars.next(), chars.next(), chars.next(), chars.next())
            {
                if is_acgt(from) && is_acgt(to) {
                    return Ok(Self::Substitution { from, to });
                }
            }
        }

        Err(invalid())
    }
}

/// One amino-acid difference between two proteins (1-based position)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidueChange {
    pub position: usize,
    /// `None` when the edited protein is longer
    pub before: Option<char>,
    /// `None` when the edited protein is shorter
    pub after: Option<char>,
}

impl fmt::Display for ResidueChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.before.unwrap_or('-'),
            self.position,
            self.after.unwrap_or('-')
        )
    }
}

/// Residue-by-residue differences between two proteins
#[must_use]
pub fn diff_proteins(before: &str, after: &str) -> Vec<ResidueChange> {
    let before: Vec<char> = before.chars().collect();
    let after: Vec<char> = after.chars().collect();

    (0..before.len().max(after.len()))
        .filter_map(|i| {
            let b = before.get(i).copied();
            let a = after.get(i).copied();
            (b != a).then_some(ResidueChange {
                position: i + 1,
                before: b,
                after: a,
            })
        })
        .collect()
}

/// Protein-level consequence of an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub position: usize,
    pub edit: EditKind,
    pub protein_before: String,
    pub protein_after: String,
    /// Length change is not a multiple of three
    pub frameshift: bool,
    /// The edited protein hits a stop earlier than the original
    pub premature_stop: bool,
    pub changes: Vec<ResidueChange>,
}

impl EditOutcome {
    /// 1-based position of the first changed residue
    #[must_use]
    pub fn first_difference(&self) -> Option<usize> {
        self.changes.first().map(|c| c.position)
    }
}

/// Apply `edit` at `position` (0-based, forward strand) and compare the
/// frame-0 translations of the sequence before and after.
///
/// # Errors
///
/// Returns `EditError::PositionOutOfRange` if the edit does not fit in the
/// sequence, or `EditError::SubstitutionMismatch` if the base at `position`
/// is not the substitution's `from` base.
pub fn simulate_edit(
    bases: &[u8],
    position: usize,
    edit: &EditKind,
) -> Result<EditOutcome, EditError> {
    let out_of_range = || EditError::PositionOutOfRange {
        position,
        length: bases.len(),
    };

    let edited: Vec<u8> = match edit {
        EditKind::Deletion(n) => {
            let end = position
                .checked_add(*n)
                .filter(|&end| end <= bases.len())
                .ok_or_else(out_of_range)?;
            [&bases[..position], &bases[end..]].concat()
        }
        EditKind::Insertion(insert) => {
            if position > bases.len() {
                return Err(out_of_range());
            }
            [&bases[..position], insert.as_bytes(), &bases[position..]].concat()
        }
        EditKind::Substitution { from, to } => {
            let found = *bases.get(position).ok_or_else(out_of_range)?;
            if char::from(found) != *from {
                return Err(EditError::SubstitutionMismatch {
                    position,
                    expected: *from,
                    found: char::from(found),
                });
            }
            let mut edited = bases.to_vec();
            edited[position] = *to as u8;
            edited
        }
    };

    let protein_before = translate(bases);
    let protein_after = translate(&edited);

    let premature_stop = match (first_stop(&protein_before), first_stop(&protein_after)) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(original), Some(edited)) => edited < original,
    };

    Ok(EditOutcome {
        position,
        edit: edit.clone(),
        frameshift: edit.length_change() % 3 != 0,
        premature_stop,
        changes: diff_proteins(&protein_before, &protein_after),
        protein_before,
        protein_after,
    })
}

/// One row of the indel scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndelOutcome {
    pub edit: EditKind,
    pub length_change: isize,
    pub frameshift: bool,
    pub premature_stop: bool,
    /// Residues before the first stop (or the whole protein without one)
    pub protein_length: usize,
}

/// Simulate +/-1 to 3 bp indels at `position`. Insertions use `A`.
///
/// # Errors
///
/// Returns `EditError::PositionOutOfRange` if `position` is past the end of
/// the sequence.
pub fn indel_scan(bases: &[u8], position: usize) -> Result<Vec<IndelOutcome>, EditError> {
    if position > bases.len() {
        return Err(EditError::PositionOutOfRange {
            position,
            length: bases.len(),
        });
    }

    let mut outcomes = Vec::with_capacity(2 * MAX_SCAN_INDEL);
    for size in 1..=MAX_SCAN_INDEL {
        let mut edits = vec![EditKind::Insertion("A".repeat(size))];
        if position + size <= bases.len() {
            edits.insert(0, EditKind::Deletion(size));
        }
        for edit in edits {
            let outcome = simulate_edit(bases, position, &edit)?;
            let protein_length =
                first_stop(&outcome.protein_after).unwrap_or(outcome.protein_after.len());
            outcomes.push(IndelOutcome {
                length_change: edit.length_change(),
                frameshift: outcome.frameshift,
                premature_stop: outcome.premature_stop,
                protein_length,
                edit,
            });
        }
    }
    Ok(outcomes)
}

/// Forward-strand start and strand of the first occurrence of `guide` in
/// `bases`, searching the forward strand before the reverse.
///
/// # Errors
///
/// Returns `EditError::GuideNotFound` if the guide occurs on neither strand.
pub fn locate_guide(bases: &[u8], guide: &[u8]) -> Result<(usize, Strand), EditError> {
    let not_found = || EditError::GuideNotFound(String::from_utf8_lossy(guide).into_owned());
    if guide.is_empty() || guide.len() > bases.len() {
        return Err(not_found());
    }

    let find = |needle: &[u8]| bases.windows(needle.len()).position(|w| w == needle);
    if let Some(start) = find(guide) {
        return Ok((start, Strand::Forward));
    }
    if let Some(start) = find(&reverse_complement(guide)) {
        return Ok((start, Strand::Reverse));
    }
    Err(not_found())
}
