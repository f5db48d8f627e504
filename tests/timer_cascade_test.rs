// ABOUTME: Integration tests for cascading timer toggles across workout, exercise and set levels
// ABOUTME: Covers deactivation cascades, idempotence, parent checks and scoped NotFound errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{assert_all_inactive, create_test_service, two_exercise_request};
use workout_sequencer::errors::ErrorCode;
use workout_sequencer::models::Workout;
use workout_sequencer::services::{TimerLevel, WorkoutService};

/// Switch every timer in the tree on, top-down
async fn activate_everything(service: &WorkoutService, workout: &Workout) {
    service.toggle_workout_timer(&workout.id, true).await.unwrap();
    for exercise in &workout.exercises {
        service
            .toggle_exercise_timer(&workout.id, &exercise.id, true)
            .await
            .unwrap();
        for set in &exercise.sets {
            service
                .toggle_exercise_set_timer(&workout.id, &exercise.id, &set.id, true)
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
async fn test_workout_deactivation_cascades_to_every_descendant() {
    let service = create_test_service(1).await.unwrap();
    let workout = service.create_workout(two_exercise_request()).await.unwrap();
    activate_everything(&service, &workout).await;

    let active = service.get_workout(&workout.id).await.unwrap();
    assert!(active.timer_active);
    assert!(active.exercises.iter().all(|e| e.timer_active));
    assert!(active
        .exercises
        .iter()
        .flat_map(|e| &e.sets)
        .all(|s| s.timer_active));

    let state = service.toggle_workout_timer(&workout.id, false).await.unwrap();
    assert_eq!(state.level, TimerLevel::Workout);
    assert!(!state.timer_active);
    // 2 exercises + 4 sets
    assert_eq!(state.cascaded, 6);

    assert_all_inactive(&service.get_workout(&workout.id).await.unwrap());
}

#[tokio::test]
async fn test_exercise_deactivation_cascades_to_its_sets_only() {
    let service = create_test_service(1).await.unwrap();
    let workout = service.create_workout(two_exercise_request()).await.unwrap();
    activate_everything(&service, &workout).await;

    let first = &workout.exercises[0];
    let state = service
        .toggle_exercise_timer(&workout.id, &first.id, false)
        .await
        .unwrap();
    assert_eq!(state.cascaded, 3);

    let after = service.get_workout(&workout.id).await.unwrap();
    assert!(after.timer_active);
    assert!(!after.exercises[0].timer_active);
    assert!(after.exercises[0].sets.iter().all(|s| !s.timer_active));
    assert!(after.exercises[1].timer_active);
    assert!(after.exercises[1].sets.iter().all(|s| s.timer_active));
}

#[tokio::test]
async fn test_deactivation_is_idempotent() {
    let service = create_test_service(1).await.unwrap();
    let workout = service.create_workout(two_exercise_request()).await.unwrap();
    activate_everything(&service, &workout).await;

    service.toggle_workout_timer(&workout.id, false).await.unwrap();
    let first = service.get_workout(&workout.id).await.unwrap();

    let again = service.toggle_workout_timer(&workout.id, false).await.unwrap();
    assert_eq!(again.cascaded, 0);
    let second = service.get_workout(&workout.id).await.unwrap();

    assert_all_inactive(&second);
    let flags = |w: &Workout| {
        w.exercises
            .iter()
            .flat_map(|e| {
                std::iter::once(e.timer_active).chain(e.sets.iter().map(|s| s.timer_active))
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(flags(&first), flags(&second));
}

#[tokio::test]
async fn test_activating_workout_leaves_children_alone() {
    let service = create_test_service(1).await.unwrap();
    let workout = service.create_workout(two_exercise_request()).await.unwrap();

    let state = service.toggle_workout_timer(&workout.id, true).await.unwrap();
    assert!(state.timer_active);

    let after = service.get_workout(&workout.id).await.unwrap();
    assert!(after.timer_active);
    assert!(after.exercises.iter().all(|e| !e.timer_active));
}

#[tokio::test]
async fn test_child_activation_requires_running_parent() {
    let service = create_test_service(1).await.unwrap();
    let workout = service.create_workout(two_exercise_request()).await.unwrap();
    let exercise = &workout.exercises[0];
    let set = &exercise.sets[0];

    let err = service
        .toggle_exercise_timer(&workout.id, &exercise.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ParentTimerInactive);

    service.toggle_workout_timer(&workout.id, true).await.unwrap();
    let err = service
        .toggle_exercise_set_timer(&workout.id, &exercise.id, &set.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ParentTimerInactive);

    // Nothing was written by the refused calls
    let after = service.get_workout(&workout.id).await.unwrap();
    assert!(!after.exercises[0].timer_active);
    assert!(!after.exercises[0].sets[0].timer_active);

    // Deactivating never needs the parent
    service
        .toggle_exercise_set_timer(&workout.id, &exercise.id, &set.id, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mismatched_parent_is_not_found() {
    let service = create_test_service(1).await.unwrap();
    let first = service.create_workout(two_exercise_request()).await.unwrap();
    let second = service.create_workout(two_exercise_request()).await.unwrap();
    service.toggle_workout_timer(&first.id, true).await.unwrap();
    service.toggle_workout_timer(&second.id, true).await.unwrap();

    // Exercise of the second workout addressed through the first
    let foreign_exercise = &second.exercises[0];
    let err = service
        .toggle_exercise_timer(&first.id, &foreign_exercise.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    // Set of exercise B addressed through exercise A
    let exercise_a = &first.exercises[0];
    let set_of_b = &first.exercises[1].sets[0];
    let err = service
        .toggle_exercise_set_timer(&first.id, &exercise_a.id, &set_of_b.id, false)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    // The foreign exercise was left untouched
    let untouched = service.get_workout(&second.id).await.unwrap();
    assert!(!untouched.exercises[0].timer_active);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let service = create_test_service(1).await.unwrap();

    let err = service
        .toggle_workout_timer("no-such-workout", true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert_eq!(err.http_status(), 404);
    assert_eq!(err.context.resource_id.as_deref(), Some("no-such-workout"));

    let err = service.get_workout("no-such-workout").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}
