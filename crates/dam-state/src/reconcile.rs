//! Turn an upload response into an [`UploadSummary`].
//!
//! Every submitted filename lands in exactly one of uploaded, replaced or
//! skipped, whatever shape the server answered with.

use dam_core::models::{ReconcileMode, UploadDetails, UploadResponse, UploadSummary, UploadedAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Replaced,
    Skipped,
}

impl UploadOutcome {
    /// Map a server status token. Unknown tokens count as skipped.
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "uploaded" | "success" | "created" => UploadOutcome::Uploaded,
            "replaced" | "duplicate" | "updated" => UploadOutcome::Replaced,
            "skipped" | "error" | "failed" | "exists" => UploadOutcome::Skipped,
            other => {
                tracing::warn!(status = other, "Unknown upload status, counting as skipped");
                UploadOutcome::Skipped
            }
        }
    }
}

pub fn reconcile(submitted: &[String], response: &UploadResponse) -> UploadSummary {
    let assets = response.assets();
    if assets.iter().any(|a| a.upload_status.is_some()) {
        reconcile_explicit(submitted, &assets)
    } else {
        reconcile_positional(submitted, response, assets.len())
    }
}

/// Pair each submitted name with a returned asset (by name, then by position)
/// and classify it by that asset's status. Names with no matching asset are
/// skipped; a matched asset without a status counts as uploaded.
fn reconcile_explicit(submitted: &[String], assets: &[UploadedAsset]) -> UploadSummary {
    let mut used = vec![false; assets.len()];
    let mut details = UploadDetails::default();

    for (index, name) in submitted.iter().enumerate() {
        let by_name = assets
            .iter()
            .enumerate()
            .position(|(i, a)| !used[i] && a.display_name() == Some(name.as_str()));
        let matched = by_name.or_else(|| (index < assets.len() && !used[index]).then_some(index));

        let outcome = match matched {
            Some(i) => {
                used[i] = true;
                assets[i]
                    .upload_status
                    .as_deref()
                    .map(UploadOutcome::from_status)
                    .unwrap_or(UploadOutcome::Uploaded)
            }
            None => UploadOutcome::Skipped,
        };

        push(&mut details, outcome, name);
    }

    UploadSummary::from_details(details, ReconcileMode::Explicit)
}

/// Split the submitted names in order: the first `uploaded` are uploaded,
/// the next `replaced` are replaced, the rest skipped. Counts are clamped to
/// what remains.
fn reconcile_positional(submitted: &[String], response: &UploadResponse, returned: usize) -> UploadSummary {
    let total = submitted.len();

    let (uploaded, replaced) = match response.summary {
        Some(counts) => {
            let uploaded = counts.uploaded.min(total);
            let replaced = counts.replaced.min(total - uploaded);
            if counts.total() != total {
                tracing::warn!(
                    submitted = total,
                    uploaded = counts.uploaded,
                    replaced = counts.replaced,
                    skipped = counts.skipped,
                    "Upload summary does not match submitted file count"
                );
            }
            (uploaded, replaced)
        }
        None => {
            let uploaded = response
                .count
                .or((returned > 0).then_some(returned))
                .unwrap_or(total)
                .min(total);
            (uploaded, 0)
        }
    };

    tracing::warn!(
        files = total,
        "Upload response has no per-file status, assigning outcomes by position"
    );

    let mut details = UploadDetails::default();
    for (index, name) in submitted.iter().enumerate() {
        let outcome = if index < uploaded {
            UploadOutcome::Uploaded
        } else if index < uploaded + replaced {
            UploadOutcome::Replaced
        } else {
            UploadOutcome::Skipped
        };
        push(&mut details, outcome, name);
    }

    UploadSummary::from_details(details, ReconcileMode::Positional)
}

fn push(details: &mut UploadDetails, outcome: UploadOutcome, name: &str) {
    let list = match outcome {
        UploadOutcome::Uploaded => &mut details.uploaded,
        UploadOutcome::Replaced => &mut details.replaced,
        UploadOutcome::Skipped => &mut details.skipped,
    };
    list.push(name.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use dam_core::models::UploadCounts;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn response(json: serde_json::Value) -> UploadResponse {
        serde_json::from_value(json).unwrap()
    }

    fn assert_partition(submitted: &[String], summary: &UploadSummary) {
        assert_eq!(summary.total(), submitted.len());
        let mut all: Vec<String> = summary
            .details
            .uploaded
            .iter()
            .chain(&summary.details.replaced)
            .chain(&summary.details.skipped)
            .cloned()
            .collect();
        all.sort();
        let mut expected = submitted.to_vec();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_positional_split_by_summary() {
        let submitted = names(&["a.png", "b.png", "c.png"]);
        let resp = UploadResponse {
            success: true,
            summary: Some(UploadCounts {
                uploaded: 2,
                replaced: 0,
                skipped: 1,
            }),
            ..UploadResponse::default()
        };

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.mode, ReconcileMode::Positional);
        assert_eq!(summary.details.uploaded, names(&["a.png", "b.png"]));
        assert!(summary.details.replaced.is_empty());
        assert_eq!(summary.details.skipped, names(&["c.png"]));
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_positional_clamps_oversized_counts() {
        let submitted = names(&["a.png", "b.png"]);
        let resp = UploadResponse {
            success: true,
            summary: Some(UploadCounts {
                uploaded: 1,
                replaced: 5,
                skipped: 3,
            }),
            ..UploadResponse::default()
        };

        let summary = reconcile(&submitted, &resp);

        assert_eq!((summary.uploaded, summary.replaced, summary.skipped), (1, 1, 0));
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_positional_remainder_is_skipped() {
        let submitted = names(&["a.png", "b.png", "c.png", "d.png"]);
        let resp = UploadResponse {
            success: true,
            summary: Some(UploadCounts {
                uploaded: 1,
                replaced: 1,
                skipped: 0,
            }),
            ..UploadResponse::default()
        };

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.details.skipped, names(&["c.png", "d.png"]));
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_missing_summary_uses_count() {
        let submitted = names(&["a.png", "b.png", "c.png"]);
        let resp = response(serde_json::json!({ "success": true, "count": 2 }));

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_missing_summary_and_count_means_all_uploaded() {
        let submitted = names(&["a.png", "b.png"]);
        let summary = reconcile(&submitted, &UploadResponse::default());
        assert_eq!(summary.uploaded, 2);
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_explicit_statuses_win_over_summary() {
        let submitted = names(&["a.png", "b.png", "c.png"]);
        let resp = response(serde_json::json!({
            "success": true,
            "data": [
                { "id": 1, "original_name": "c.png", "uploadStatus": "Duplicate" },
                { "id": 2, "original_name": "a.png", "uploadStatus": "created" },
                { "id": 3, "original_name": "b.png", "uploadStatus": " EXISTS " }
            ],
            "summary": { "uploaded": 3, "replaced": 0, "skipped": 0 }
        }));

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.mode, ReconcileMode::Explicit);
        assert_eq!(summary.details.uploaded, names(&["a.png"]));
        assert_eq!(summary.details.replaced, names(&["c.png"]));
        assert_eq!(summary.details.skipped, names(&["b.png"]));
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_explicit_unmatched_and_unknown_are_skipped() {
        let submitted = names(&["a.png", "b.png", "c.png"]);
        let resp = response(serde_json::json!({
            "success": true,
            "data": [
                { "id": 1, "original_name": "a.png", "upload_status": "quarantined" },
                { "id": 2, "original_name": "b.png" }
            ]
        }));

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.details.uploaded, names(&["b.png"]));
        assert_eq!(summary.details.skipped, names(&["a.png", "c.png"]));
        assert_partition(&submitted, &summary);
    }

    #[test]
    fn test_explicit_duplicate_names_each_match_once() {
        let submitted = names(&["a.png", "a.png"]);
        let resp = response(serde_json::json!({
            "data": [
                { "original_name": "a.png", "upload_status": "created" },
                { "original_name": "a.png", "upload_status": "replaced" }
            ]
        }));

        let summary = reconcile(&submitted, &resp);

        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.replaced, 1);
    }

    #[test]
    fn test_status_tokens() {
        assert_eq!(UploadOutcome::from_status("SUCCESS"), UploadOutcome::Uploaded);
        assert_eq!(UploadOutcome::from_status("updated"), UploadOutcome::Replaced);
        assert_eq!(UploadOutcome::from_status("failed"), UploadOutcome::Skipped);
        assert_eq!(UploadOutcome::from_status("???"), UploadOutcome::Skipped);
    }
}
