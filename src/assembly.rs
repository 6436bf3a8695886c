use std::path::PathBuf;

use tracing::warn;

use crate::config::{AssemblyPolicy, Direction};
use crate::content::Language;
use crate::error::{LexreelError, LexreelResult};
use crate::frames::FrameTag;

/// Per-item progress through the assembly stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemState {
    Idle,
    NativeReady(PathBuf),
    TargetReady(PathBuf),
    PairEncoded { native: PathBuf, target: PathBuf },
    Appended,
    /// Dropped from the sequence by the run's failure policy.
    Skipped,
}

/// Closed-form length of the final sequence.
///
/// `item_count` counts items that actually reach the sequence; `pause`
/// is whether pause clips are inserted at all.
pub fn expected_sequence_len(
    item_count: usize,
    repeat_count: u32,
    pause: bool,
    direction: Direction,
) -> usize {
    if item_count == 0 {
        return 0;
    }
    let per_item = 1 + repeat_count as usize;
    let pauses = if !pause {
        0
    } else {
        match direction {
            // One inner pause per item plus one between consecutive items.
            Direction::SecondaryFirst => 2 * item_count - 1,
            Direction::PrimaryFirst => item_count,
        }
    };
    item_count * per_item + pauses
}

/// Collects per-item clips in any completion order and emits the run
/// sequence strictly in item-index order.
///
/// Pause clips are inserted only when the policy's `pause_duration` is
/// positive and a silence clip exists; otherwise pauses are silently
/// skipped.
pub struct SequenceAssembler {
    policy: AssemblyPolicy,
    silence_clip: Option<PathBuf>,
    states: Vec<ItemState>,
}

impl SequenceAssembler {
    pub fn new(
        policy: AssemblyPolicy,
        item_count: usize,
        silence_clip: Option<PathBuf>,
    ) -> LexreelResult<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            silence_clip,
            states: vec![ItemState::Idle; item_count],
        })
    }

    pub fn state(&self, item: usize) -> Option<&ItemState> {
        self.states.get(item)
    }

    /// Record one encoded clip for an item. Completion order is free;
    /// ordering is restored at [`SequenceAssembler::finish`].
    pub fn record_clip(&mut self, tag: FrameTag, clip: PathBuf) -> LexreelResult<()> {
        let state = self.states.get_mut(tag.item).ok_or_else(|| {
            LexreelError::validation(format!("clip for unknown item index {}", tag.item))
        })?;
        *state = match (std::mem::replace(state, ItemState::Idle), tag.language) {
            (ItemState::Idle, Language::Native) => ItemState::NativeReady(clip),
            (ItemState::Idle, Language::Target) => ItemState::TargetReady(clip),
            (ItemState::TargetReady(target), Language::Native) => ItemState::PairEncoded {
                native: clip,
                target,
            },
            (ItemState::NativeReady(native), Language::Target) => ItemState::PairEncoded {
                native,
                target: clip,
            },
            (prev, lang) => {
                *state = prev;
                return Err(LexreelError::validation(format!(
                    "duplicate or misplaced {} clip for item {}",
                    lang.as_str(),
                    tag.item
                )));
            }
        };
        Ok(())
    }

    /// Drop an item from the sequence (skip failure policy).
    pub fn mark_skipped(&mut self, item: usize) -> LexreelResult<()> {
        let state = self.states.get_mut(item).ok_or_else(|| {
            LexreelError::validation(format!("skip for unknown item index {item}"))
        })?;
        warn!(item, "item skipped, dropped from sequence");
        *state = ItemState::Skipped;
        Ok(())
    }

    fn pause_clip(&self) -> Option<&PathBuf> {
        if self.policy.pause_duration > 0.0 {
            self.silence_clip.as_ref()
        } else {
            None
        }
    }

    /// Emit the ordered sequence. Fails if any non-skipped item never
    /// reached `PairEncoded`.
    pub fn finish(mut self) -> LexreelResult<Vec<PathBuf>> {
        let pause = self.pause_clip().cloned();
        let repeat = self.policy.repeat_count as usize;

        let mut groups: Vec<Vec<PathBuf>> = Vec::new();
        for (item, state) in self.states.iter_mut().enumerate() {
            let taken = std::mem::replace(state, ItemState::Appended);
            let (native, target) = match taken {
                ItemState::Skipped => {
                    *state = ItemState::Skipped;
                    continue;
                }
                ItemState::PairEncoded { native, target } => (native, target),
                other => {
                    return Err(LexreelError::validation(format!(
                        "item {item} never completed encoding (state {other:?})"
                    )));
                }
            };

            let mut group = Vec::with_capacity(repeat + 2);
            match self.policy.direction {
                Direction::SecondaryFirst => {
                    group.push(native);
                    if let Some(p) = &pause {
                        group.push(p.clone());
                    }
                    group.extend(std::iter::repeat_n(target, repeat));
                }
                Direction::PrimaryFirst => {
                    group.extend(std::iter::repeat_n(target, repeat));
                    if let Some(p) = &pause {
                        group.push(p.clone());
                    }
                    group.push(native);
                }
            }
            groups.push(group);
        }

        // SecondaryFirst separates consecutive items with a pause; no
        // trailing pause after the last item.
        let separator = match self.policy.direction {
            Direction::SecondaryFirst => pause,
            Direction::PrimaryFirst => None,
        };
        let mut sequence = Vec::new();
        let n = groups.len();
        for (i, group) in groups.into_iter().enumerate() {
            sequence.extend(group);
            if i + 1 < n
                && let Some(p) = &separator
            {
                sequence.push(p.clone());
            }
        }
        Ok(sequence)
    }
}
