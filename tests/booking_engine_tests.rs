//! End-to-end tests of the booking engine against a real (in-memory)
//! database: overlap detection, status reconciliation, availability
//! projection, and the return settlement flow.

use anyhow::Result;
use fleetbook::availability;
use fleetbook::dates::{self, end_of_day, start_of_day};
use fleetbook::error::BookingError;
use fleetbook::lifecycle::{self, DeliveryInput, ReturnInput};
use fleetbook::models::bike::BikeStatus;
use fleetbook::models::booking::{BookingStatus, FuelLevel};
use fleetbook::models::payment::PaymentMethod;
use fleetbook::overlap;
use fleetbook::repositories::{self, BikeRepository, BookingRepository, PaymentRepository};
use fleetbook::settlement::{self, ReturnCharges};
use fleetbook::status_sync;
use std::sync::Arc;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_test_bike, create_test_org, day, insert_booking, setup_test_db_arc};

#[tokio::test]
async fn same_day_handover_is_not_a_conflict() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;

    // A booking starting on the existing one's end day is allowed.
    let conflict = overlap::find_conflict(
        db.as_ref(),
        &org,
        &bike,
        start_of_day(day(2025, 1, 5)),
        end_of_day(day(2025, 1, 10)),
        None,
    )
    .await?;
    assert!(conflict.is_none());

    // Starting one day earlier truly overlaps.
    let conflict = overlap::find_conflict(
        db.as_ref(),
        &org,
        &bike,
        start_of_day(day(2025, 1, 4)),
        end_of_day(day(2025, 1, 10)),
        None,
    )
    .await?;
    assert!(conflict.is_some());

    Ok(())
}

#[tokio::test]
async fn earliest_conflicting_booking_is_reported() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    let later = insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 8),
        day(2025, 1, 12),
        BookingStatus::Upcoming,
    )
    .await?;
    let earlier = insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 2),
        day(2025, 1, 6),
        BookingStatus::Upcoming,
    )
    .await?;

    let conflict = overlap::find_conflict(
        db.as_ref(),
        &org,
        &bike,
        start_of_day(day(2025, 1, 1)),
        end_of_day(day(2025, 1, 20)),
        None,
    )
    .await?
    .expect("candidate covers both bookings");

    assert_eq!(conflict.id, earlier.id);
    assert_ne!(conflict.id, later.id);
    Ok(())
}

#[tokio::test]
async fn terminal_and_deleted_bookings_do_not_conflict() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Cancelled,
    )
    .await?;
    insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Returned,
    )
    .await?;
    let deleted = insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Upcoming,
    )
    .await?;
    BookingRepository::new(Arc::clone(&db))
        .soft_delete(&org, &deleted.id)
        .await?;

    let conflict = overlap::find_conflict(
        db.as_ref(),
        &org,
        &bike,
        start_of_day(day(2025, 1, 1)),
        end_of_day(day(2025, 1, 5)),
        None,
    )
    .await?;
    assert!(conflict.is_none());
    Ok(())
}

#[tokio::test]
async fn a_booking_never_conflicts_with_itself() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    let booking = insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Upcoming,
    )
    .await?;

    // An update extending the same booking's range must skip itself.
    let conflict = overlap::find_conflict(
        db.as_ref(),
        &org,
        &bike,
        start_of_day(day(2025, 1, 1)),
        end_of_day(day(2025, 1, 8)),
        Some(booking.id),
    )
    .await?;
    assert!(conflict.is_none());
    Ok(())
}

#[tokio::test]
async fn reconcile_marks_started_booking_rented_and_is_idempotent() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let repo = BikeRepository::new(Arc::clone(&db));

    insert_booking(
        &db,
        org,
        bike_id,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;

    let as_of = start_of_day(day(2025, 1, 2));
    let bike = repo.find_by_id(&org, &bike_id).await?.unwrap();
    let first = status_sync::reconcile_bike(db.as_ref(), &bike, as_of).await?;
    assert_eq!(first, BikeStatus::Rented);

    let bike = repo.find_by_id(&org, &bike_id).await?.unwrap();
    assert_eq!(bike.status, BikeStatus::Rented);

    // Second run with no intervening writes yields the same status.
    let second = status_sync::reconcile_bike(db.as_ref(), &bike, as_of).await?;
    assert_eq!(second, BikeStatus::Rented);

    // An overdue, not-yet-returned booking still occupies the bike.
    let overdue = status_sync::reconcile_bike(db.as_ref(), &bike, start_of_day(day(2025, 1, 20)))
        .await?;
    assert_eq!(overdue, BikeStatus::Rented);

    Ok(())
}

#[tokio::test]
async fn upcoming_booking_does_not_occupy_before_its_start() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let repo = BikeRepository::new(Arc::clone(&db));

    insert_booking(
        &db,
        org,
        bike_id,
        day(2025, 1, 10),
        day(2025, 1, 12),
        BookingStatus::Upcoming,
    )
    .await?;

    let bike = repo.find_by_id(&org, &bike_id).await?.unwrap();
    let before = status_sync::reconcile_bike(db.as_ref(), &bike, start_of_day(day(2025, 1, 5)))
        .await?;
    assert_eq!(before, BikeStatus::Available);

    let after = status_sync::reconcile_bike(db.as_ref(), &bike, start_of_day(day(2025, 1, 10)))
        .await?;
    assert_eq!(after, BikeStatus::Rented);
    Ok(())
}

#[tokio::test]
async fn maintenance_override_survives_reconcile() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let repo = BikeRepository::new(Arc::clone(&db));

    let bike = repo.find_by_id(&org, &bike_id).await?.unwrap();
    let as_of = start_of_day(day(2025, 1, 2));

    let bike = status_sync::set_operator_status(db.as_ref(), bike, BikeStatus::Maintenance, as_of)
        .await
        .expect("idle bike can enter maintenance");
    assert_eq!(bike.status, BikeStatus::Maintenance);

    // Reconciliation must not clear the override.
    let status = status_sync::reconcile_bike(db.as_ref(), &bike, as_of).await?;
    assert_eq!(status, BikeStatus::Maintenance);
    let stored = repo.find_by_id(&org, &bike_id).await?.unwrap();
    assert_eq!(stored.status, BikeStatus::Maintenance);

    // Clearing it hands the status back to reconciliation.
    let cleared =
        status_sync::set_operator_status(db.as_ref(), stored, BikeStatus::Available, as_of)
            .await
            .expect("maintenance can be cleared");
    assert_eq!(cleared.status, BikeStatus::Available);
    Ok(())
}

#[tokio::test]
async fn occupied_bike_cannot_enter_maintenance() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let repo = BikeRepository::new(Arc::clone(&db));

    insert_booking(
        &db,
        org,
        bike_id,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;

    let bike = repo.find_by_id(&org, &bike_id).await?.unwrap();
    let result = status_sync::set_operator_status(
        db.as_ref(),
        bike,
        BikeStatus::Maintenance,
        start_of_day(day(2025, 1, 3)),
    )
    .await;

    assert!(matches!(result, Err(BookingError::BikeRented)));
    Ok(())
}

#[tokio::test]
async fn availability_absorbs_back_to_back_chain() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;
    insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 5),
        day(2025, 1, 10),
        BookingStatus::Upcoming,
    )
    .await?;

    let open = availability::load_open_bookings(db.as_ref(), &org, &bike).await?;
    let projection = availability::project(&open, start_of_day(day(2025, 1, 3)));

    assert!(!projection.is_available_now);
    assert_eq!(projection.next_available_date, Some(day(2025, 1, 10)));
    assert_eq!(projection.return_in_days, 7);
    assert_eq!(projection.blocking_chain.len(), 2);
    Ok(())
}

#[tokio::test]
async fn return_settlement_flow() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let bikes = BikeRepository::new(Arc::clone(&db));
    let bookings = BookingRepository::new(Arc::clone(&db));

    // 5 days at 500/day, returned 3 days late.
    let booking = insert_booking(
        &db,
        org,
        bike_id,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;
    let bike = bikes.find_by_id(&org, &bike_id).await?.unwrap();
    let as_of = start_of_day(day(2025, 1, 8));
    status_sync::reconcile_bike(db.as_ref(), &bike, as_of).await?;

    let charges = ReturnCharges {
        additional_payment: Some(4000),
        ..Default::default()
    };
    let settlement = settlement::settle(&booking, bike.daily_rate, None, &charges, as_of);
    assert_eq!(settlement.overdue_days, 3);
    assert_eq!(settlement.overdue_fee, 1500);
    assert_eq!(settlement.new_total, 2500 + 1500);
    assert_eq!(settlement.new_paid, 4000);

    let input = ReturnInput {
        fines_note: Some("late return".to_string()),
        charges,
        ..Default::default()
    };
    let active = lifecycle::apply_return(booking.clone(), &input, &settlement, as_of)
        .expect("active booking can be returned");
    let returned = bookings.update(active).await?;

    assert_eq!(returned.status, BookingStatus::Returned);
    assert_eq!(returned.total_amount, 4000);
    assert_eq!(returned.paid_amount, 4000);
    // End date rewritten to the actual return instant.
    assert_eq!(dates::to_utc(returned.end_date), as_of);
    assert_eq!(returned.notes.as_deref(), Some("late return"));

    repositories::payment::record(db.as_ref(), &org, &returned.id, 4000, PaymentMethod::Cash)
        .await?;
    let payments = PaymentRepository::new(Arc::clone(&db))
        .list_for_booking(&org, &returned.id)
        .await?;
    assert_eq!(payments.iter().map(|p| p.amount).sum::<i64>(), returned.paid_amount);

    // The bike frees up once the booking is terminal.
    let bike = bikes.find_by_id(&org, &bike_id).await?.unwrap();
    let status = status_sync::reconcile_bike(db.as_ref(), &bike, as_of).await?;
    assert_eq!(status, BikeStatus::Available);

    // Settled bookings can no longer be cancelled or deleted.
    assert!(matches!(
        lifecycle::ensure_discardable(&returned),
        Err(BookingError::InvalidStatus(BookingStatus::Returned))
    ));
    Ok(())
}

#[tokio::test]
async fn bike_delete_blocked_while_bookings_open() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike_id = create_test_bike(&db, org, "KA-01-HJ-1234").await?;
    let bikes = BikeRepository::new(Arc::clone(&db));
    let bookings = BookingRepository::new(Arc::clone(&db));

    let booking = insert_booking(
        &db,
        org,
        bike_id,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Upcoming,
    )
    .await?;

    assert_eq!(bikes.open_booking_count(&org, &bike_id).await?, 1);

    bookings.soft_delete(&org, &booking.id).await?;
    assert_eq!(bikes.open_booking_count(&org, &bike_id).await?, 0);

    let deleted = bikes.soft_delete(&org, &bike_id).await?;
    assert!(deleted.is_some());
    assert!(bikes.find_by_id(&org, &bike_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn organization_sweep_reconciles_whole_fleet() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let rented = create_test_bike(&db, org, "KA-01-HJ-0001").await?;
    create_test_bike(&db, org, "KA-01-HJ-0002").await?;

    insert_booking(
        &db,
        org,
        rented,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Active,
    )
    .await?;

    let as_of = start_of_day(day(2025, 1, 2));
    let stats = status_sync::reconcile_organization(db.as_ref(), &org, 1, as_of).await?;
    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.updated, 1);

    // Second sweep finds nothing to correct.
    let stats = status_sync::reconcile_organization(db.as_ref(), &org, 1, as_of).await?;
    assert_eq!(stats.updated, 0);
    Ok(())
}

#[tokio::test]
async fn delivery_persists_document_references() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let org = create_test_org(&db).await?;
    let bike = create_test_bike(&db, org, "KA-01-HJ-1234").await?;

    let booking = insert_booking(
        &db,
        org,
        bike,
        day(2025, 1, 1),
        day(2025, 1, 5),
        BookingStatus::Upcoming,
    )
    .await?;

    let input = DeliveryInput {
        helmets_given: 1,
        fuel_level_start: FuelLevel::Full,
        odometer_start: 8_200,
        existing_damage: None,
        document_refs: Some(vec![
            "licence-front.jpg".to_string(),
            "rental-agreement.pdf".to_string(),
        ]),
        identity_verified: true,
        security_deposit: None,
    };

    let booking_id = booking.id;
    let active = lifecycle::deliver(booking, input, start_of_day(day(2025, 1, 1)))?;
    let repo = BookingRepository::new(Arc::clone(&db));
    repo.update(active).await?;

    // The references survive the JSON column round trip.
    let stored = repo
        .find_by_id(&org, &booking_id)
        .await?
        .expect("booking exists");
    assert_eq!(stored.status, BookingStatus::Active);
    assert_eq!(
        stored.document_refs,
        Some(serde_json::json!([
            "licence-front.jpg",
            "rental-agreement.pdf"
        ]))
    );

    Ok(())
}
