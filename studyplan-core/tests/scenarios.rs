use studyplan_core::{
    Catalog, DerivedState, SimulationRequest, StatusMap, StatusValue, StrategyId, Subject,
    SubjectId, Term, analyze_finals, can_take_final, exam_prerequisites_met, resolve, simulate,
};

fn pair(exam_prerequisite: bool) -> Catalog {
    let mut y = Subject::new("Y", 1, Term::Second).with_course_prerequisites(["X"]);
    if exam_prerequisite {
        y = y.with_exam_prerequisites(["X"]);
    }
    Catalog::new(vec![Subject::new("X", 1, Term::First), y]).unwrap()
}

fn statuses(entries: &[(&str, StatusValue)]) -> StatusMap {
    entries.iter().map(|&(id, status)| (id, status)).collect()
}

#[test]
fn fresh_student_sees_only_roots() {
    let report = resolve(&pair(false), &StatusMap::new());
    assert_eq!(report.state("X"), Some(DerivedState::Available));
    assert_eq!(report.state("Y"), Some(DerivedState::Blocked));
}

#[test]
fn pending_final_unlocks_course_enrollment() {
    let status = statuses(&[("X", StatusValue::PendingFinal)]);
    let report = resolve(&pair(false), &status);
    assert_eq!(report.state("X"), Some(DerivedState::PendingFinal));
    assert_eq!(report.state("Y"), Some(DerivedState::Available));
}

#[test]
fn exam_waits_for_approved_prerequisite() {
    let catalog = pair(true);
    let y = catalog.get("Y").unwrap();

    let taking = statuses(&[("X", StatusValue::PendingFinal), ("Y", StatusValue::InProgress)]);
    assert_eq!(resolve(&catalog, &taking).state("Y"), Some(DerivedState::InProgress));
    assert!(!exam_prerequisites_met(&catalog, &taking, y));

    let both_pending =
        statuses(&[("X", StatusValue::PendingFinal), ("Y", StatusValue::PendingFinal)]);
    assert!(!can_take_final(&catalog, &both_pending, y));
    let report = analyze_finals(&catalog, &both_pending);
    assert!(!report.get("Y").unwrap().can_be_rendered_now);
    assert_eq!(report.get("Y").unwrap().blocked_by, vec![SubjectId::new("X")]);

    let unlocked = statuses(&[("X", StatusValue::Approved), ("Y", StatusValue::PendingFinal)]);
    assert!(can_take_final(&catalog, &unlocked, y));
}

#[test]
fn final_impact_counts_waiting_dependents() {
    let catalog = Catalog::new(vec![
        Subject::new("F", 1, Term::FullYear),
        Subject::new("D1", 2, Term::First).with_course_prerequisites(["F"]),
        Subject::new("D2", 2, Term::Second).with_course_prerequisites(["F"]),
        Subject::new("other", 2, Term::Second),
    ])
    .unwrap();
    let status = statuses(&[("F", StatusValue::PendingFinal)]);
    let report = analyze_finals(&catalog, &status);
    let impact = report.get("F").unwrap();
    assert_eq!(impact.total_impact, 2);
    assert_eq!(
        impact.unlocks_for_course,
        vec![SubjectId::new("D1"), SubjectId::new("D2")]
    );
    assert!(impact.can_be_rendered_now);
}

#[test]
fn balanced_semester_respects_caps() {
    let mut subjects = Vec::new();
    for i in 0..3 {
        subjects.push(Subject::new(format!("pf{i}"), 1, Term::First));
    }
    for i in 0..5 {
        subjects.push(Subject::new(format!("ns{i}"), 1, Term::Second));
    }
    for i in 0..2 {
        subjects.push(Subject::new(format!("ap{i}"), 1, Term::FullYear));
    }
    let catalog = Catalog::new(subjects).unwrap();
    let initial = statuses(&[
        ("pf0", StatusValue::PendingFinal),
        ("pf1", StatusValue::PendingFinal),
        ("pf2", StatusValue::PendingFinal),
        ("ap0", StatusValue::Approved),
        ("ap1", StatusValue::Approved),
    ]);

    let result = simulate(
        &catalog,
        &initial,
        &SimulationRequest::new(StrategyId::Balanced, 1),
    )
    .unwrap();

    let semester = &result.history[0];
    assert_eq!(semester.finals_approved.len(), 3);
    assert_eq!(semester.enrolled.len(), 3);
    assert_eq!(semester.approved, 5);
    assert_eq!(semester.pending_final, 3);
    for id in &semester.enrolled {
        assert_eq!(result.final_status.get(id.as_str()), StatusValue::PendingFinal);
    }
    assert_eq!(
        semester.enrolled,
        vec![SubjectId::new("ns0"), SubjectId::new("ns1"), SubjectId::new("ns2")]
    );
    assert_eq!(result.summary.initial_approved, 2);
    assert_eq!(result.summary.final_approved, 5);
    assert_eq!(result.summary.progress_gain, 30);
    assert_eq!(initial.get("pf0"), StatusValue::PendingFinal);
}
