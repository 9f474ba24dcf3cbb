// ABOUTME: Integration tests for template writes through the service
// ABOUTME: Ordered create, cascade delete, delete-then-recreate update, set replacement and program pushes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use common::{exercise, full_body, harness, set, BENCH, PLANK, SQUAT};
use workout_templates::remote::{Column, RemoteStore, RowFilter};
use workout_templates::ErrorCode;
use workout_templates_core::models::{
    ExerciseRowId, NewExerciseSet, NewTemplate, OwnerId, TemplateId,
};

#[tokio::test]
async fn test_create_writes_the_whole_graph() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    let draft = NewTemplate::named("  Push day  ")
        .with_exercise(exercise(BENCH, 1, 2))
        .with_exercise(exercise(SQUAT, 0, 3));

    let id = h.service.save_template(&draft, Some(&owner)).await?;
    let template = h.service.load_template_by_id(&id).await?;

    assert_eq!(template.name, "Push day");
    assert_eq!(template.owner_id.as_ref(), Some(&owner));
    let order: Vec<&str> = template.exercises.iter().map(|e| e.exercise_id.as_str()).collect();
    assert_eq!(order, vec![SQUAT, BENCH]);
    assert_eq!(template.total_sets(), 5);
    let first = &template.exercises[0].sets[0];
    assert_eq!(first.set_number, 1);
    assert_eq!(first.rest_seconds, 90);
    Ok(())
}

#[tokio::test]
async fn test_invalid_draft_writes_nothing() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");

    let blank = NewTemplate::named("   ").with_exercise(exercise(SQUAT, 0, 1));
    let duplicate_sets = NewTemplate::named("Dup").with_exercise(
        exercise(SQUAT, 0, 0).with_set(set(1, 5)).with_set(set(1, 8)),
    );
    let duplicate_order = NewTemplate::named("Order")
        .with_exercise(exercise(SQUAT, 0, 1))
        .with_exercise(exercise(BENCH, 0, 1));

    for draft in [blank, duplicate_sets, duplicate_order] {
        let err = h.service.save_template(&draft, Some(&owner)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }
    assert!(h.remote.sqlite().select_templates(&RowFilter::all()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_partial_create_reports_the_orphaned_template() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    h.service.load_user_templates(&owner).await?;
    assert!(h.service.cached_user_templates(&owner).is_some());

    h.remote.fail_set_inserts.store(true, Ordering::SeqCst);
    let err = h
        .service
        .save_template(&full_body("Half written"), Some(&owner))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PartialWrite);
    let partial = err.partial.clone().unwrap();
    assert_eq!(partial.exercises_written, 1);
    assert_eq!(partial.sets_written, 0);

    // The template row exists remotely and the cache was invalidated
    let orphan = err.orphaned_template().unwrap().clone();
    let rows = h
        .remote
        .sqlite()
        .select_templates(&RowFilter::all().eq(Column::Id, orphan.as_str()))
        .await?;
    assert_eq!(rows.len(), 1);
    assert!(h.service.cached_user_templates(&owner).is_none());

    // Callers sweep the orphan with an ordinary delete
    h.remote.fail_set_inserts.store(false, Ordering::SeqCst);
    assert!(h.service.delete_template(&orphan, Some(&owner)).await?);
    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_and_respects_ownership() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    let id = h.service.save_template(&full_body("Mine"), Some(&owner)).await?;

    // Wrong owner and public scope match nothing
    assert!(!h.service.delete_template(&id, Some(&OwnerId::new("u2"))).await?);
    assert!(!h.service.delete_template(&id, None).await?);

    assert!(h.service.delete_template(&id, Some(&owner)).await?);
    let store = h.remote.sqlite();
    assert!(store
        .select_template_exercises(&RowFilter::all().eq(Column::TemplateId, id.as_str()))
        .await?
        .is_empty());
    assert!(store.select_exercise_sets(&RowFilter::all()).await?.is_empty());

    assert!(!h.service.delete_template(&id, Some(&owner)).await?);
    Ok(())
}

#[tokio::test]
async fn test_update_replaces_old_id_with_new_one() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    let old_id = h.service.save_template(&full_body("Before"), Some(&owner)).await?;
    h.service.load_user_templates(&owner).await?;

    let draft = NewTemplate::named("After").with_exercise(exercise(PLANK, 0, 2));
    let new_id = h.service.update_template(&old_id, &draft, Some(&owner)).await?;
    assert_ne!(old_id, new_id);

    let templates = h.service.load_user_templates(&owner).await?;
    let ids: Vec<&TemplateId> = templates.iter().map(|t| &t.id).collect();
    assert_eq!(ids, vec![&new_id]);
    assert_eq!(templates[0].name, "After");
    assert_eq!(templates[0].exercises[0].exercise_id, PLANK);

    let err = h.service.load_template_by_id(&old_id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    Ok(())
}

#[tokio::test]
async fn test_update_of_missing_template_creates_nothing() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");

    let err = h
        .service
        .update_template(&TemplateId::new("ghost"), &full_body("Ghost"), Some(&owner))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert!(h.remote.sqlite().select_templates(&RowFilter::all()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_set_replacement_is_whole() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    let id = h.service.save_template(&full_body("Sets"), Some(&owner)).await?;
    let before = h.service.load_template_by_id(&id).await?;
    let squat = &before.exercises[0];
    assert_eq!(squat.sets.len(), 3);

    h.service.load_user_templates(&owner).await?;
    let replacement = vec![
        NewExerciseSet {
            set_number: 2,
            target_reps: 3,
            target_weight: 120.0,
            rest_seconds: 240,
        },
        set(1, 5),
    ];
    h.service
        .update_exercise_sets(&squat.row_id, &replacement)
        .await?;
    assert!(h.service.cached_user_templates(&owner).is_none());

    let after = h.service.load_template_by_id(&id).await?;
    let sets = &after.exercises[0].sets;
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].set_number, 1);
    assert_eq!(sets[0].target_reps, 5);
    assert_eq!(sets[1].target_weight, 120.0);
    // Other exercises are untouched
    assert_eq!(after.exercises[1].sets.len(), 2);

    // Clearing all sets is allowed
    h.service.update_exercise_sets(&squat.row_id, &[]).await?;
    let cleared = h.service.load_template_by_id(&id).await?;
    assert!(cleared.exercises[0].sets.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_set_replacement_rejects_bad_input() -> Result<()> {
    let h = harness().await;
    let id = h.service.save_template(&full_body("Sets"), None).await?;
    let row_id = h.service.load_template_by_id(&id).await?.exercises[0].row_id.clone();

    let err = h
        .service
        .update_exercise_sets(&row_id, &[set(0, 5)])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let err = h
        .service
        .update_exercise_sets(&ExerciseRowId::new("no-such-row"), &[set(1, 5)])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    // Nothing was deleted by the rejected calls
    assert_eq!(h.service.load_template_by_id(&id).await?.exercises[0].sets.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_push_program_reports_each_template() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("coach-client");
    let drafts = vec![
        full_body("Day 1"),
        NewTemplate::named(""),
        NewTemplate::named("Day 3").with_exercise(exercise(PLANK, 0, 1)),
    ];

    let report = h.service.push_program(Some(&owner), &drafts).await?;
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(!report.is_complete());
    assert_eq!(report.failed[0].code, ErrorCode::InvalidInput.as_str());
    assert!(report.failed[0].orphaned_template.is_none());

    let templates = h.service.load_user_templates(&owner).await?;
    assert_eq!(templates.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_push_program_records_partial_writes() -> Result<()> {
    let h = harness().await;
    h.remote.fail_set_inserts.store(true, Ordering::SeqCst);

    let drafts = vec![
        NewTemplate::named("No sets").with_exercise(exercise(PLANK, 0, 0)),
        full_body("With sets"),
    ];
    let report = h.service.push_program(None, &drafts).await?;

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].code, ErrorCode::PartialWrite.as_str());
    assert!(report.failed[0].orphaned_template.is_some());
    Ok(())
}

#[tokio::test]
async fn test_delete_owner_templates_only_touches_that_owner() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    for name in ["A", "B", "C"] {
        h.service.save_template(&full_body(name), Some(&owner)).await?;
    }
    h.service
        .save_template(&full_body("Other"), Some(&OwnerId::new("u2")))
        .await?;
    h.service.save_template(&full_body("Public"), None).await?;

    assert_eq!(h.service.delete_owner_templates(&owner).await?, 3);
    assert!(h.service.refresh_user_templates(&owner).await?.is_empty());
    assert_eq!(
        h.service
            .refresh_user_templates(&OwnerId::new("u2"))
            .await?
            .len(),
        1
    );
    assert_eq!(h.service.load_public_templates(true).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_public_mutation_is_visible_on_next_read() -> Result<()> {
    let h = harness().await;
    let first = h.service.save_template(&full_body("First"), None).await?;
    assert_eq!(h.service.load_public_templates(false).await?.len(), 1);

    let second = h.service.save_template(&full_body("Second"), None).await?;
    let ids: Vec<TemplateId> = h
        .service
        .load_public_templates(false)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));

    // A delete is visible the same way
    assert!(h.service.delete_template(&first, None).await?);
    let ids: Vec<TemplateId> = h
        .service
        .load_public_templates(false)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![second]);
    Ok(())
}

#[tokio::test]
async fn test_public_update_never_serves_the_deleted_id() -> Result<()> {
    let h = harness().await;
    let old_id = h.service.save_template(&full_body("Old"), None).await?;
    h.service.load_public_templates(false).await?;

    let new_id = h
        .service
        .update_template(&old_id, &full_body("New"), None)
        .await?;

    let templates = h.service.load_public_templates(false).await?;
    let ids: Vec<&TemplateId> = templates.iter().map(|t| &t.id).collect();
    assert_eq!(ids, vec![&new_id]);
    assert_eq!(templates[0].name, "New");
    Ok(())
}

#[tokio::test]
async fn test_user_mutation_is_visible_without_forced_refresh() -> Result<()> {
    let h = harness().await;
    let owner = OwnerId::new("u1");
    let first = h.service.save_template(&full_body("First"), Some(&owner)).await?;
    assert_eq!(h.service.load_user_templates(&owner).await?.len(), 1);

    let second = h.service.save_template(&full_body("Second"), Some(&owner)).await?;
    let ids: Vec<TemplateId> = h
        .service
        .load_user_templates(&owner)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));

    // Past the memory TTL the reloaded disk entry holds both as well
    h.clock.advance(std::time::Duration::from_secs(10 * 60));
    assert_eq!(h.service.load_user_templates(&owner).await?.len(), 2);
    Ok(())
}
