use super::common::*;
use crate::focus_areas::api::ApiError;
use crate::focus_areas::domain::{EvaluationConfig, FocusArea, FocusAreaId};
use crate::focus_areas::draft::{FocusAreaDraft, OBJECTIVE_PLACEHOLDER};
use crate::focus_areas::evaluation::EvaluationField;
use crate::focus_areas::repository::FocusAreaStore;
use crate::focus_areas::sync::{
    CoordinatorError, FocusAreaCoordinator, InFlightKey, MutationAction, NotificationSeverity,
    ReconcileError,
};

fn severities(coordinator: &FocusAreaCoordinator<FakePortal>) -> Vec<NotificationSeverity> {
    coordinator
        .take_notifications()
        .into_iter()
        .map(|notification| notification.severity)
        .collect()
}

fn ids(areas: &[FocusArea]) -> Vec<FocusAreaId> {
    areas.iter().filter_map(|area| area.id.clone()).collect()
}

#[tokio::test]
async fn reconcile_fetches_organization_then_program() {
    let (portal, seeded) = seeded_portal();
    let coordinator = FocusAreaCoordinator::new(portal.clone(), program_id());

    coordinator.reconcile().await.expect("reconcile");

    assert_eq!(portal.calls(), vec![Call::List, Call::Program]);
    assert_eq!(
        ids(&coordinator.all_focus_areas()),
        vec![seeded.leadership.clone(), seeded.communication.clone()]
    );
    assert_eq!(coordinator.selected_ids(), vec![seeded.leadership.clone()]);

    let listening = coordinator.find(&seeded.listening).expect("listening");
    assert_eq!(
        listening.eval,
        EvaluationConfig::default_for(Some(seeded.listening.clone()))
    );
    let communication = coordinator.find(&seeded.communication).expect("communication");
    assert_eq!(communication.eval.thresholds(), [1, 2, 4]);
}

#[tokio::test]
async fn selectable_focus_areas_are_top_level_parents() {
    let (coordinator, _portal, seeded) = loaded_coordinator().await;

    assert_eq!(
        ids(&coordinator.selectable_focus_areas()),
        vec![seeded.leadership.clone(), seeded.communication.clone()]
    );
}

#[tokio::test]
async fn failed_refresh_raises_an_error_notification() {
    let (portal, _seeded) = seeded_portal();
    let coordinator = FocusAreaCoordinator::new(portal.clone(), program_id());
    portal.fail_next(Call::List, 1);
    portal.fail_next(Call::Program, 1);

    let err = coordinator.refresh().await.expect_err("portal offline");

    assert!(matches!(
        err,
        CoordinatorError::Reconcile(ReconcileError::Both { .. })
    ));
    assert_eq!(severities(&coordinator), vec![NotificationSeverity::Error]);
    assert!(coordinator.all_focus_areas().is_empty());
}

#[tokio::test]
async fn partial_reconcile_keeps_the_successful_half() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    let strategy = portal
        .store
        .save(
            FocusAreaDraft::new_parent(program_id(), "Strategy")
                .into_payload()
                .expect("valid draft"),
        )
        .expect("stored")
        .id
        .expect("id");
    portal
        .store
        .set_selection(&program_id(), &[seeded.leadership.clone(), strategy.clone()])
        .expect("selectable");
    portal.fail_next(Call::List, 1);

    let err = coordinator.reconcile().await.expect_err("list fails");

    assert!(matches!(err, ReconcileError::Organization(_)));
    assert_eq!(
        coordinator.selected_ids(),
        vec![seeded.leadership.clone(), strategy.clone()]
    );
    assert!(find_area(&coordinator.all_focus_areas(), &strategy).is_none());
}

#[tokio::test]
async fn creating_a_child_sends_placeholders_and_reconciles() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let created = coordinator
        .save_focus_area(FocusAreaDraft::new_child(
            program_id(),
            seeded.leadership.clone(),
            "Coaching Others",
        ))
        .await
        .expect("created");

    let created_id = created.id.clone().expect("server id");
    assert_eq!(created.objective.as_deref(), Some(OBJECTIVE_PLACEHOLDER));
    assert_eq!(
        created.eval,
        Some(EvaluationConfig::default_for(Some(created_id.clone())))
    );
    assert_eq!(portal.calls(), vec![Call::Save, Call::List, Call::Program]);

    let leadership = find_area(&coordinator.selected_focus_areas(), &seeded.leadership)
        .cloned()
        .expect("leadership stays selected");
    assert!(ids(&leadership.children).contains(&created_id));
    assert!(find_area(&coordinator.all_focus_areas(), &created_id).is_some());

    let notifications = coordinator.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, NotificationSeverity::Success);
    assert_eq!(notifications[0].message, "Focus area created");
    assert!(coordinator.take_notifications().is_empty());
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_portal() {
    let (coordinator, portal, _seeded) = loaded_coordinator().await;

    let err = coordinator
        .save_focus_area(FocusAreaDraft::new_parent(program_id(), ""))
        .await
        .expect_err("blank name");

    assert!(matches!(err, CoordinatorError::InvalidDraft(_)));
    assert!(portal.calls().is_empty());
}

#[tokio::test]
async fn failed_save_raises_an_error_and_skips_reconcile() {
    let (coordinator, portal, _seeded) = loaded_coordinator().await;
    portal.fail_next(Call::Save, 1);
    let before = coordinator.all_focus_areas();

    let err = coordinator
        .save_focus_area(FocusAreaDraft::new_parent(program_id(), "Strategy"))
        .await
        .expect_err("portal offline");

    assert!(matches!(err, CoordinatorError::Api(_)));
    assert_eq!(portal.calls(), vec![Call::Save]);
    assert_eq!(coordinator.all_focus_areas(), before);
    let notifications = coordinator.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, NotificationSeverity::Error);
    assert!(notifications[0]
        .message
        .starts_with("Failed to create focus area"));
}

#[tokio::test]
async fn refresh_failure_after_save_is_only_a_warning() {
    let (coordinator, portal, _seeded) = loaded_coordinator().await;
    portal.fail_next(Call::List, 1);

    coordinator
        .save_focus_area(FocusAreaDraft::new_parent(program_id(), "Strategy"))
        .await
        .expect("server accepted the save");

    let notifications = coordinator.take_notifications();
    assert_eq!(
        notifications
            .iter()
            .map(|notification| notification.severity)
            .collect::<Vec<_>>(),
        vec![NotificationSeverity::Success, NotificationSeverity::Warning]
    );
    assert!(notifications[1].message.contains("could not be refreshed"));
}

#[tokio::test]
async fn local_eval_patch_reaches_nested_nodes_in_both_collections() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    let patched = config(0, 20, 5, 10, 15);
    let leadership_before = coordinator.find(&seeded.leadership).expect("leadership");
    let feedback_before = coordinator.find(&seeded.feedback).expect("feedback");

    assert!(coordinator.update_eval_settings(&seeded.delegation, patched.clone()));

    for collection in [
        coordinator.all_focus_areas(),
        coordinator.selected_focus_areas(),
    ] {
        let delegation = find_area(&collection, &seeded.delegation).expect("delegation");
        assert_eq!(delegation.eval.as_ref(), Some(&patched));
    }
    assert_eq!(
        coordinator.find(&seeded.leadership),
        Some(leadership_before)
    );
    assert_eq!(coordinator.find(&seeded.feedback), Some(feedback_before));
    assert!(!coordinator.update_eval_settings(&id("fa-missing"), patched));
    assert!(portal.calls().is_empty());
}

#[tokio::test]
async fn saving_evaluation_patches_then_reconciles() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let saved = coordinator
        .save_evaluation(&seeded.listening, config(0, 8, 2, 4, 6))
        .await
        .expect("saved");

    assert_eq!(saved.focus_area_id, Some(seeded.listening.clone()));
    assert_eq!(
        portal.calls(),
        vec![Call::Evaluation, Call::List, Call::Program]
    );
    let listening = coordinator.find(&seeded.listening).expect("listening");
    assert_eq!(listening.eval, saved);
    let communication = coordinator.find(&seeded.communication).expect("communication");
    assert_eq!(communication.eval.thresholds(), [1, 2, 4]);
    assert_eq!(severities(&coordinator), vec![NotificationSeverity::Success]);
}

#[tokio::test]
async fn invalid_evaluation_is_rejected_locally() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let err = coordinator
        .save_evaluation(&seeded.delegation, config(-1, 10, 5, 4, 6))
        .await
        .expect_err("threshold 1 above threshold 2");

    match err {
        CoordinatorError::InvalidEvaluation(errors) => {
            assert!(errors.contains(EvaluationField::Threshold1));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(portal.calls().is_empty());
}

#[tokio::test]
async fn evaluation_survives_a_failed_refresh() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    portal.fail_next(Call::List, 1);

    let saved = coordinator
        .save_evaluation(&seeded.delegation, config(0, 8, 2, 4, 6))
        .await
        .expect("server accepted the save");

    let delegation = find_area(&coordinator.all_focus_areas(), &seeded.delegation)
        .cloned()
        .expect("delegation");
    assert_eq!(delegation.eval, Some(saved));
    let raised = severities(&coordinator);
    assert!(raised.contains(&NotificationSeverity::Warning));
    assert!(!raised.contains(&NotificationSeverity::Error));
}

#[tokio::test]
async fn failed_evaluation_save_leaves_state_untouched() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    portal.fail_next(Call::Evaluation, 1);
    let before = coordinator.find(&seeded.delegation).expect("delegation");

    let err = coordinator
        .save_evaluation(&seeded.delegation, config(0, 8, 2, 4, 6))
        .await
        .expect_err("portal offline");

    assert!(matches!(err, CoordinatorError::Api(_)));
    assert_eq!(coordinator.find(&seeded.delegation), Some(before));
    assert_eq!(severities(&coordinator), vec![NotificationSeverity::Error]);
    assert!(!coordinator.is_in_flight(&InFlightKey::new(
        MutationAction::Evaluation,
        Some(seeded.delegation.clone())
    )));
}

#[tokio::test]
async fn deleting_a_selected_parent_drops_it_from_the_program() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    coordinator
        .delete_focus_area(&seeded.leadership)
        .await
        .expect("deleted");

    assert_eq!(portal.calls(), vec![Call::Delete, Call::List, Call::Program]);
    assert!(coordinator.selected_ids().is_empty());
    assert_eq!(
        ids(&coordinator.all_focus_areas()),
        vec![seeded.communication.clone()]
    );
    assert!(coordinator.find(&seeded.delegation).is_none());
}

#[tokio::test]
async fn delete_with_failed_program_refresh_leaves_a_stale_selection() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    portal.fail_next(Call::Program, 1);

    coordinator
        .delete_focus_area(&seeded.leadership)
        .await
        .expect("server accepted the delete");

    assert_eq!(
        ids(&coordinator.all_focus_areas()),
        vec![seeded.communication.clone()]
    );
    assert_eq!(coordinator.selected_ids(), vec![seeded.leadership.clone()]);
    assert_eq!(
        severities(&coordinator),
        vec![NotificationSeverity::Success, NotificationSeverity::Warning]
    );
}

#[tokio::test]
async fn toggling_after_a_stale_delete_drops_the_removed_parent() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    portal.fail_next(Call::Program, 1);
    coordinator
        .delete_focus_area(&seeded.leadership)
        .await
        .expect("server accepted the delete");
    portal.reset_calls();

    let selected = coordinator
        .toggle_selection(&seeded.communication)
        .await
        .expect("selection saved");

    assert_eq!(ids(&selected), vec![seeded.communication.clone()]);
    assert_eq!(coordinator.selected_ids(), vec![seeded.communication.clone()]);
    assert_eq!(portal.calls(), vec![Call::Selection]);
}

#[tokio::test]
async fn toggling_still_works_when_the_organization_list_failed_to_load() {
    let (portal, seeded) = seeded_portal();
    let coordinator = FocusAreaCoordinator::new(portal.clone(), program_id());
    portal.fail_next(Call::List, 1);
    coordinator.refresh().await.expect_err("organization list offline");
    assert!(coordinator.all_focus_areas().is_empty());

    coordinator
        .toggle_selection(&seeded.communication)
        .await
        .expect("selection saved");

    assert_eq!(
        coordinator.selected_ids(),
        vec![seeded.leadership.clone(), seeded.communication.clone()]
    );
}

#[tokio::test]
async fn failed_delete_raises_an_error() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    portal.fail_next(Call::Delete, 1);

    let err = coordinator
        .delete_focus_area(&seeded.communication)
        .await
        .expect_err("portal offline");

    assert!(matches!(err, CoordinatorError::Api(_)));
    assert!(coordinator.find(&seeded.communication).is_some());
    assert_eq!(severities(&coordinator), vec![NotificationSeverity::Error]);
}

#[tokio::test]
async fn selection_is_deduplicated_and_replaced_from_the_response() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let selected = coordinator
        .set_selection(vec![
            seeded.communication.clone(),
            seeded.leadership.clone(),
            seeded.communication.clone(),
        ])
        .await
        .expect("selection saved");

    let expected = vec![seeded.communication.clone(), seeded.leadership.clone()];
    assert_eq!(ids(&selected), expected);
    assert_eq!(coordinator.selected_ids(), expected);
    let program = portal.store.program(&program_id()).expect("program");
    assert_eq!(ids(&program.focus_areas), expected);
    assert_eq!(portal.calls(), vec![Call::Selection]);
}

#[tokio::test]
async fn portal_rejects_children_in_the_selection() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let err = coordinator
        .set_selection(vec![seeded.leadership.clone(), seeded.delegation.clone()])
        .await
        .expect_err("child id");

    assert!(matches!(
        err,
        CoordinatorError::Api(ApiError::Status { status: 422, .. })
    ));
    assert_eq!(portal.calls(), vec![Call::Selection]);
    assert_eq!(coordinator.selected_ids(), vec![seeded.leadership.clone()]);
    assert_eq!(severities(&coordinator), vec![NotificationSeverity::Error]);
}

#[tokio::test]
async fn toggling_a_known_child_is_refused_locally() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;

    let err = coordinator
        .toggle_selection(&seeded.delegation)
        .await
        .expect_err("child id");

    assert_eq!(err, CoordinatorError::NotSelectable(seeded.delegation.clone()));
    assert!(portal.calls().is_empty());
}

#[tokio::test]
async fn toggling_adds_and_removes_parents() {
    let (coordinator, _portal, seeded) = loaded_coordinator().await;

    coordinator
        .toggle_selection(&seeded.leadership)
        .await
        .expect("deselect");
    assert!(coordinator.selected_ids().is_empty());

    coordinator
        .toggle_selection(&seeded.communication)
        .await
        .expect("select");
    assert_eq!(coordinator.selected_ids(), vec![seeded.communication.clone()]);
}

#[tokio::test]
async fn concurrent_save_on_the_same_node_is_rejected() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    let gate = portal.gate(Call::Evaluation);
    let key = InFlightKey::new(MutationAction::Evaluation, Some(seeded.delegation.clone()));

    let (first, (second, other)) = tokio::join!(
        coordinator.save_evaluation(&seeded.delegation, config(0, 8, 2, 4, 6)),
        async {
            gate.entered.notified().await;
            assert!(coordinator.is_in_flight(&key));
            let second = coordinator
                .save_evaluation(&seeded.delegation, config(0, 9, 2, 4, 6))
                .await;
            let other = coordinator
                .save_evaluation(&seeded.feedback, config(0, 9, 2, 4, 6))
                .await;
            gate.release.notify_one();
            (second, other)
        }
    );

    first.expect("first save completes");
    other.expect("a different node is not blocked");
    assert_eq!(second, Err(CoordinatorError::InFlight(key.clone())));
    assert!(!coordinator.is_in_flight(&key));
    let delegation = coordinator.find(&seeded.delegation).expect("delegation");
    assert_eq!(delegation.eval.max_score, 8);
}

#[tokio::test]
async fn slow_reconcile_overwrites_a_newer_local_patch() {
    let (coordinator, portal, seeded) = loaded_coordinator().await;
    let gate = portal.gate(Call::List);
    let patched = config(0, 20, 5, 10, 15);

    let (reconciled, ()) = tokio::join!(coordinator.reconcile(), async {
        gate.entered.notified().await;
        assert!(coordinator.update_eval_settings(&seeded.delegation, patched.clone()));
        assert_eq!(
            coordinator.find(&seeded.delegation).map(|node| node.eval),
            Some(patched.clone())
        );
        gate.release.notify_one();
    });

    reconciled.expect("reconcile");
    let delegation = coordinator.find(&seeded.delegation).expect("delegation");
    assert_eq!(
        delegation.eval,
        EvaluationConfig::default_for(Some(seeded.delegation.clone()))
    );
}
