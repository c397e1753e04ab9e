//! Field-level plurality voting
//!
//! Votes are grouped by field path in first-seen order. Each group is tallied
//! with an order-preserving tally, so ties always go to the value observed
//! first. The canonical record is rebuilt from the per-field winners.

use crate::config::ListVotePolicy;
use crate::flatten::flatten_record;
use quorum_domain::{
    ExtractionRun, FieldPath, FieldVote, Record, VoteDetail, VoteTally, VotingFailure, VotingResult,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Decide the winner for one field path
///
/// Returns `None` when `votes` is empty; such fields never appear in the
/// vote details.
pub fn vote_for_field(votes: &[FieldVote]) -> Option<VoteDetail> {
    let mut tally = VoteTally::new();
    for vote in votes {
        tally.record(&vote.serialized_value);
    }

    let leader = tally.leader()?;
    let winning_value = leader.value.clone();
    let confidence = leader.count as f64 / tally.total() as f64;

    Some(VoteDetail {
        winning_value,
        vote_tally: tally,
        confidence,
        all_votes: votes.to_vec(),
    })
}

/// Flatten every successful run and vote on the pooled field values
pub fn vote_on_runs(runs: &[ExtractionRun], policy: ListVotePolicy) -> VotingResult {
    let successful = runs.iter().filter(|r| r.succeeded()).count();

    let votes: Vec<FieldVote> = runs
        .iter()
        .filter_map(|run| {
            run.structured_record()
                .map(|record| flatten_record(record, &run.model_run(), policy))
        })
        .flatten()
        .collect();

    vote(votes, successful, runs.len())
}

/// Vote on a pooled set of field votes
///
/// `successful_run_count` and `total_run_count` are reported unchanged and
/// decide which failure shape is returned when nothing can be voted on.
pub fn vote(votes: Vec<FieldVote>, successful_run_count: usize, total_run_count: usize) -> VotingResult {
    if successful_run_count == 0 {
        warn!("No successful runs out of {}", total_run_count);
        return VotingResult::failed(VotingFailure::AllRunsFailed, 0, total_run_count);
    }
    if votes.is_empty() {
        warn!("{} successful runs produced no fields", successful_run_count);
        return VotingResult::failed(
            VotingFailure::NoFieldsCollected,
            successful_run_count,
            total_run_count,
        );
    }

    info!(
        "Voting on {} field values from {} of {} runs",
        votes.len(),
        successful_run_count,
        total_run_count
    );

    let mut final_result = Record::new();
    let mut vote_details = BTreeMap::new();

    for (path, group) in group_by_path(votes) {
        let Some(detail) = vote_for_field(&group) else {
            continue;
        };

        debug!(
            "{}: '{}' with confidence {:.2}",
            path, detail.winning_value, detail.confidence
        );

        let value = restore_value(&path, &detail.winning_value);
        if !set_nested_field(&mut final_result, path.segments(), value) {
            warn!("Field {} conflicts with an existing shape; left out of the record", path);
        }
        vote_details.insert(path.to_string(), detail);
    }

    VotingResult {
        final_result,
        vote_details,
        successful_run_count,
        total_run_count,
        error: None,
    }
}

/// Group votes by dotted path, keeping first-seen order of paths and of votes
///
/// Paths that print the same (`{"a.b": ..}` and `{"a": {"b": ..}}`) share one
/// group; the group keeps the segments of the first path seen.
fn group_by_path(votes: Vec<FieldVote>) -> Vec<(FieldPath, Vec<FieldVote>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(FieldPath, Vec<FieldVote>)> = Vec::new();

    for vote in votes {
        let dotted = vote.field_path.to_string();
        match index.get(&dotted) {
            Some(&i) => groups[i].1.push(vote),
            None => {
                index.insert(dotted, groups.len());
                groups.push((vote.field_path.clone(), vec![vote]));
            }
        }
    }

    groups
}

/// Turn a winning token back into a record value
///
/// List-looking tokens are re-parsed; anything that fails stays a string.
fn restore_value(path: &FieldPath, winning_value: &str) -> Value {
    if winning_value.starts_with('[') && winning_value.ends_with(']') {
        match serde_json::from_str::<Value>(winning_value) {
            Ok(list @ Value::Array(_)) => return list,
            _ => warn!("{}: list-like value did not re-parse, keeping text", path),
        }
    }
    Value::String(winning_value.to_string())
}

/// Place `value` at `segments`, creating intermediate mappings
///
/// Returns false when the first shape placed at or above this path is not a
/// mapping that can take the value; the existing shape is kept.
fn set_nested_field(record: &mut Record, segments: &[String], value: Value) -> bool {
    let Some((leaf, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = record;
    for key in parents {
        let entry = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Record::new()));
        match entry {
            Value::Object(map) => current = map,
            _ => return false,
        }
    }

    if current.contains_key(leaf) {
        return false;
    }
    current.insert(leaf.clone(), value);
    true
}
