use std::collections::HashMap;

use super::*;
use crate::engine::alignment::AlignmentParams;
use crate::engine::calibrate::CalibrationModel;
use crate::engine::system::fixtures::{lection, membership, system, verse};
use crate::engine::witness::LectionaryWitness;

fn unit_calibration() -> CalibrationConfig {
    CalibrationConfig {
        name: "unit".to_string(),
        alignment: AlignmentParams {
            match_score: 1.0,
            mismatch_score: -1.0,
            gap_open: -2.0,
            gap_extend: -1.0,
        },
        model: CalibrationModel {
            weights: [
                0.07124444438506426,
                -0.2723489152810223,
                -0.634987796501936,
                -0.05103656566400282,
            ],
            prior_log_odds: 0.0,
        },
    }
}

fn witness(siglum: &str, texts: &[(i64, &str)]) -> LectionaryWitness {
    LectionaryWitness::new(
        siglum,
        Some(1),
        texts
            .iter()
            .map(|(id, text)| (*id, text.to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

fn three_lection_system() -> LectionarySystem {
    system(
        vec![
            membership(30, 3, 2),
            membership(10, 1, 0),
            membership(20, 2, 1),
            membership(40, 4, 3),
        ],
        vec![
            lection(1, vec![verse(1, Some(1), 10), verse(2, Some(2), 10)]),
            lection(2, vec![verse(3, Some(3), 10)]),
            lection(3, vec![verse(4, Some(4), 10), verse(5, Some(5), 10)]),
            lection(4, vec![verse(6, Some(6), 10), verse(7, Some(7), 10)]),
        ],
    )
}

#[test]
fn end_to_end_identical_witness_scores_full_similarity() {
    let system = system(
        vec![membership(1, 1, 0)],
        vec![lection(1, vec![verse(1, Some(1), 10), verse(2, Some(2), 10)])],
    );
    let base = witness("L1", &[(1, "ΕΝ ΑΡΧΗ ΗΝ"), (2, "Ο ΛΟΓΟΣ")]);
    let other = witness("L2", &[(1, "ΕΝ ΑΡΧΗ ΗΝ"), (2, "Ο ΛΟΓΟΣ")]);

    let table = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions::default(),
    );

    assert_eq!(table.rows.len(), 1);
    let row = &table.rows[0];
    assert_eq!(
        row.counts[0],
        AlignmentCounts {
            matches: 17,
            mismatches: 0,
            gap_opens: 0,
            gap_extensions: 0,
        }
    );
    assert_eq!(row.scores[0].similarity, Some(100.0));
    assert!(row.scores[0].probability.unwrap() > 0.5);
}

#[test]
fn rows_follow_system_order_and_skip_short_lections() {
    let system = three_lection_system();
    let base = witness("L1", &[(1, "ΑΒΓ"), (3, "ΑΒΓ"), (4, "ΑΒΓ"), (6, "ΑΒΓ")]);
    let other = witness("L2", &[(1, "ΑΒΓ"), (3, "ΑΒΓ"), (4, "ΑΒΔ"), (6, "ΑΒΓ")]);

    let table = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions::default(),
    );

    let ids: Vec<i64> = table.rows.iter().map(|row| row.membership_id).collect();
    assert_eq!(ids, vec![10, 30, 40]);
    let orders: Vec<i64> = table.rows.iter().map(|row| row.membership_order).collect();
    assert_eq!(orders, vec![0, 2, 3]);
    assert_eq!(table.skipped_memberships, 1);
    assert_eq!(table.position_of(30), Some(1));
    assert_eq!(table.position_of(20), None);
    assert_eq!(table.row_for(40).map(|row| row.lection_id), Some(4));
    assert_eq!(table.rows[0].lection_label, "L1 in Test System on Day 0");
}

#[test]
fn min_verses_of_one_keeps_single_verse_lections() {
    let system = three_lection_system();
    let base = witness("L1", &[]);
    let options = SweepOptions {
        min_verses: 1,
        ..SweepOptions::default()
    };

    let table = sweep_system(&system, &base, &[], &unit_calibration(), &options);
    let ids: Vec<i64> = table.rows.iter().map(|row| row.membership_id).collect();
    assert_eq!(ids, vec![10, 20, 30, 40]);
}

#[test]
fn untranscribed_witness_is_absent_not_zero() {
    let system = three_lection_system();
    let base = witness("L1", &[(1, "ΑΒΓ"), (2, "ΔΕΖ")]);
    let silent = witness("L2", &[]);
    let agreeing = witness("L3", &[(1, "ΑΒΓ")]);

    let table = sweep_system(
        &system,
        &base,
        &[&silent, &agreeing],
        &unit_calibration(),
        &SweepOptions::default(),
    );

    let first = &table.rows[0];
    assert_eq!(first.scores[0], WitnessScore::default());
    assert_eq!(first.scores[1].similarity, Some(100.0));
    assert!(first.scores[1].probability.is_some());

    let later = &table.rows[1];
    assert_eq!(later.scores[1].similarity, None);
    assert_eq!(later.scores[1].probability, None);

    let csv = table.to_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Lection,Lection_Membership__id,Lection_Membership__order,L2_similarity,L2_probability,L3_similarity,L3_probability"
    );
    assert!(lines[1].starts_with("L1 in Test System on Day 0,10,0,,,100,"));
    assert!(lines[2].ends_with(",,,,"));
}

#[test]
fn verse_mean_mode_averages_per_verse_percentages() {
    let system = system(
        vec![membership(1, 1, 0)],
        vec![lection(1, vec![verse(1, Some(1), 10), verse(2, Some(2), 10)])],
    );
    let base = witness("L1", &[(1, "ΑΒ"), (2, "ΑΒΓΔΕΖΗΘ")]);
    let other = witness("L2", &[(1, "ΑΓ"), (2, "ΑΒΓΔΕΖΗΘ")]);

    let pooled = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions::default(),
    );
    let verse_mean = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions {
            similarity_mode: SimilarityMode::VerseMean,
            ..SweepOptions::default()
        },
    );

    assert_eq!(pooled.rows[0].scores[0].similarity, Some(90.0));
    assert_eq!(verse_mean.rows[0].scores[0].similarity, Some(75.0));
    assert_eq!(
        pooled.rows[0].scores[0].probability,
        verse_mean.rows[0].scores[0].probability
    );
}

#[test]
fn restrictions_and_means_operate_on_kept_rows() {
    let system = three_lection_system();
    let base = witness("L1", &[(1, "ΑΒΓΔ"), (4, "ΑΒΓΔ"), (6, "ΑΒΓΔ")]);
    let other = witness("L2", &[(1, "ΑΒΓΔ"), (4, "ΑΒΓΕ")]);

    let table = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions::default(),
    );
    assert_eq!(table.mean_similarity(0), Some(87.5));
    assert_eq!(table.mean_similarity(3), None);

    let restricted = table.clone().restrict_order(Some(1), Some(2));
    let ids: Vec<i64> = restricted.rows.iter().map(|row| row.membership_id).collect();
    assert_eq!(ids, vec![30]);

    let picked = table.restrict_memberships(&[40, 10]);
    let ids: Vec<i64> = picked.rows.iter().map(|row| row.membership_id).collect();
    assert_eq!(ids, vec![10, 40]);
}

#[test]
fn ignore_incipits_changes_only_the_opening_verse() {
    let system = system(
        vec![membership(1, 1, 0)],
        vec![lection(1, vec![verse(1, Some(1), 10), verse(2, Some(2), 10)])],
    );
    let base = witness("L1", &[(1, "ΤΩ ΚΑΙΡΩ"), (2, "ΑΒΓ")]);
    let other = witness("L2", &[(1, "ΕΙΠΕΝ Ο ΚΥΡΙΟΣ"), (2, "ΑΒΓ")]);

    let table = sweep_system(
        &system,
        &base,
        &[&other],
        &unit_calibration(),
        &SweepOptions {
            ignore_incipits: true,
            ..SweepOptions::default()
        },
    );

    assert_eq!(table.rows[0].counts[0].length(), 3);
    assert_eq!(table.rows[0].scores[0].similarity, Some(100.0));
}
