use aerobook_core::booking::generate_reference;
use aerobook_core::repository::BookingRepository;
use aerobook_core::{
    Booking, BookingDetails, BookingRef, BookingUpdate, CoreError, CoreResult, Itinerary,
    NewBooking, Passenger, SeatCode,
};
use aerobook_shared::Masked;
use async_trait::async_trait;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::info;

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Takes the write lock up front so concurrent writers queue on the
    /// busy timeout instead of failing when a read upgrades to a write.
    async fn begin_write(&self) -> CoreResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(CoreError::storage)
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    depart_flight_num: i64,
    return_flight_num: Option<i64>,
    meal: String,
    seat: String,
    email: String,
    phone: String,
    #[sqlx(rename = "ref")]
    reference: i64,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            depart_flight_num: row.depart_flight_num,
            return_flight_num: row.return_flight_num,
            meal: row.meal,
            seat: row.seat,
            email: row.email,
            phone: row.phone,
            reference: row.reference,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: i64,
    title: String,
    fname: String,
    lname: String,
    nationality: String,
    gender: String,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            title: row.title,
            fname: row.fname,
            lname: row.lname,
            nationality: row.nationality,
            gender: row.gender,
        }
    }
}

/// Both legs are bound twice so a one-way itinerary can reuse the same
/// statement, with the departing flight standing in for the missing return.
fn leg_params(itinerary: Itinerary) -> (i64, i64) {
    (itinerary.depart, itinerary.ret.unwrap_or(itinerary.depart))
}

async fn seat_taken_on(
    conn: &mut SqliteConnection,
    itinerary: Itinerary,
    seat: &SeatCode,
) -> Result<bool, sqlx::Error> {
    let (first, second) = leg_params(itinerary);
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM booking
        WHERE seat = ?
          AND (depart_flight_num IN (?, ?) OR return_flight_num IN (?, ?))
        "#,
    )
    .bind(seat.as_str())
    .bind(first)
    .bind(second)
    .bind(first)
    .bind(second)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

async fn find_booking_row(
    conn: &mut SqliteConnection,
    id: i64,
    reference: i64,
) -> Result<Option<BookingRow>, sqlx::Error> {
    sqlx::query_as::<Sqlite, BookingRow>(
        r#"
        SELECT id, depart_flight_num, return_flight_num, meal, seat, email, phone, ref
        FROM booking
        WHERE id = ? AND ref = ?
        "#,
    )
    .bind(id)
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<BookingRef> {
        let mut tx = self.begin_write().await?;

        if seat_taken_on(&mut tx, booking.itinerary, &booking.seat)
            .await
            .map_err(CoreError::storage)?
        {
            return Err(CoreError::Conflict(format!(
                "Seat {} has just been taken. Please choose another seat.",
                booking.seat
            )));
        }

        let reference = generate_reference();

        let id = sqlx::query(
            r#"
            INSERT INTO booking (depart_flight_num, return_flight_num, meal, seat, email, phone, ref)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.itinerary.depart)
        .bind(booking.itinerary.ret)
        .bind(&booking.meal)
        .bind(booking.seat.as_str())
        .bind(&booking.contact.email)
        .bind(&booking.contact.phone)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?
        .last_insert_rowid();

        for p in &booking.passengers {
            let passenger_id = sqlx::query(
                r#"
                INSERT INTO passenger (title, fname, lname, nationality, gender)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&p.title)
            .bind(&p.fname)
            .bind(&p.lname)
            .bind(&p.nationality)
            .bind(&p.gender)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?
            .last_insert_rowid();

            sqlx::query("INSERT INTO booking_passenger (booking_id, passenger_id) VALUES (?, ?)")
                .bind(id)
                .bind(passenger_id)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::storage)?;
        }

        tx.commit().await.map_err(CoreError::storage)?;

        info!(
            "Booking {} committed: {} passengers, seat {}, contact {}",
            id,
            booking.passengers.len(),
            booking.seat,
            Masked::new(&booking.contact.email)
        );

        Ok(BookingRef { id, reference })
    }

    async fn find_booking(&self, id: i64, reference: i64) -> CoreResult<Option<BookingDetails>> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::storage)?;

        let row = match find_booking_row(&mut conn, id, reference)
            .await
            .map_err(CoreError::storage)?
        {
            Some(row) => row,
            None => return Ok(None),
        };

        let passengers = sqlx::query_as::<_, PassengerRow>(
            r#"
            SELECT p.id, p.title, p.fname, p.lname, p.nationality, p.gender
            FROM passenger p
            JOIN booking_passenger bp ON bp.passenger_id = p.id
            WHERE bp.booking_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .map_err(CoreError::storage)?;

        Ok(Some(BookingDetails {
            booking: row.into(),
            passengers: passengers.into_iter().map(Passenger::from).collect(),
        }))
    }

    async fn update_booking(&self, id: i64, reference: i64, update: &BookingUpdate) -> CoreResult<bool> {
        let mut tx = self.begin_write().await?;

        let result = sqlx::query("UPDATE booking SET meal = ?, email = ?, phone = ? WHERE id = ? AND ref = ?")
            .bind(&update.meal)
            .bind(&update.contact.email)
            .bind(&update.contact.phone)
            .bind(id)
            .bind(reference)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        for (passenger_id, fname, lname) in &update.names {
            // Scoped to this booking's passengers so a crafted field name
            // cannot rename someone else.
            sqlx::query(
                r#"
                UPDATE passenger SET fname = ?, lname = ?
                WHERE id = ?
                  AND id IN (SELECT passenger_id FROM booking_passenger WHERE booking_id = ?)
                "#,
            )
            .bind(fname)
            .bind(lname)
            .bind(passenger_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;
        }

        tx.commit().await.map_err(CoreError::storage)?;
        info!("Booking {} updated", id);
        Ok(true)
    }

    async fn cancel_booking(&self, id: i64, reference: i64) -> CoreResult<bool> {
        let mut tx = self.begin_write().await?;

        if find_booking_row(&mut tx, id, reference)
            .await
            .map_err(CoreError::storage)?
            .is_none()
        {
            return Ok(false);
        }

        sqlx::query(
            "DELETE FROM passenger WHERE id IN (SELECT passenger_id FROM booking_passenger WHERE booking_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        sqlx::query("DELETE FROM booking_passenger WHERE booking_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        sqlx::query("DELETE FROM booking WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;
        info!("Booking {} cancelled", id);
        Ok(true)
    }

    async fn taken_seats(&self, itinerary: Itinerary) -> CoreResult<Vec<String>> {
        let (first, second) = leg_params(itinerary);
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT seat FROM booking
            WHERE depart_flight_num IN (?, ?) OR return_flight_num IN (?, ?)
            ORDER BY seat
            "#,
        )
        .bind(first)
        .bind(second)
        .bind(first)
        .bind(second)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)
    }

    async fn seat_taken(&self, itinerary: Itinerary, seat: &SeatCode) -> CoreResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::storage)?;
        seat_taken_on(&mut conn, itinerary, seat)
            .await
            .map_err(CoreError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbClient;
    use aerobook_core::booking::{REFERENCE_MAX, REFERENCE_MIN};
    use aerobook_core::{ContactDetails, PassengerDetails, SeatLayout};

    fn passenger(fname: &str) -> PassengerDetails {
        PassengerDetails {
            title: "Mx".into(),
            fname: fname.into(),
            lname: "Rivera".into(),
            nationality: "Chilean".into(),
            gender: "Non-binary".into(),
        }
    }

    fn new_booking(depart: i64, ret: Option<i64>, seat: &str) -> NewBooking {
        NewBooking {
            itinerary: Itinerary { depart, ret },
            meal: "Vegan".into(),
            seat: SeatCode::parse(seat, &SeatLayout::default()).unwrap(),
            contact: ContactDetails {
                email: "rivera@example.cl".into(),
                phone: "+56 9 1234 5678".into(),
            },
            passengers: vec![passenger("Sam"), passenger("Alex")],
        }
    }

    async fn repo() -> SqliteBookingRepository {
        let db = DbClient::in_memory().await.unwrap();
        SqliteBookingRepository::new(db.pool)
    }

    #[tokio::test]
    async fn test_create_and_find_round_trip_booking() {
        let repo = repo().await;
        let booking_ref = repo.create_booking(&new_booking(1, Some(2), "3C")).await.unwrap();
        assert!((REFERENCE_MIN..=REFERENCE_MAX).contains(&booking_ref.reference));

        let details = repo
            .find_booking(booking_ref.id, booking_ref.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.booking.depart_flight_num, 1);
        assert_eq!(details.booking.return_flight_num, Some(2));
        assert_eq!(details.booking.seat, "3C");
        assert_eq!(
            details.passengers.iter().map(|p| p.fname.as_str()).collect::<Vec<_>>(),
            vec!["Sam", "Alex"]
        );
    }

    #[tokio::test]
    async fn test_wrong_reference_hides_booking() {
        let repo = repo().await;
        let booking_ref = repo.create_booking(&new_booking(1, None, "3C")).await.unwrap();
        let wrong = booking_ref.reference + 1;

        assert!(repo.find_booking(booking_ref.id, wrong).await.unwrap().is_none());
        assert!(!repo.cancel_booking(booking_ref.id, wrong).await.unwrap());

        let update = BookingUpdate {
            meal: "Halal".into(),
            contact: ContactDetails { email: "x@y.z".into(), phone: "1".into() },
            names: vec![],
        };
        assert!(!repo.update_booking(booking_ref.id, wrong, &update).await.unwrap());
    }

    #[tokio::test]
    async fn test_seat_conflicts_per_flight() {
        let repo = repo().await;
        repo.create_booking(&new_booking(1, Some(2), "3C")).await.unwrap();

        let seat = SeatCode::parse("3C", &SeatLayout::default()).unwrap();
        assert!(repo.seat_taken(Itinerary { depart: 1, ret: None }, &seat).await.unwrap());
        assert!(repo.seat_taken(Itinerary { depart: 2, ret: None }, &seat).await.unwrap());
        assert!(!repo.seat_taken(Itinerary { depart: 3, ret: None }, &seat).await.unwrap());

        let err = repo.create_booking(&new_booking(2, None, "3C")).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        repo.create_booking(&new_booking(1, None, "4D")).await.unwrap();
        assert_eq!(
            repo.taken_seats(Itinerary { depart: 1, ret: None }).await.unwrap(),
            vec!["3C".to_string(), "4D".to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_changes_contact_meal_and_names() {
        let repo = repo().await;
        let booking_ref = repo.create_booking(&new_booking(1, None, "3C")).await.unwrap();
        let details = repo.find_booking(booking_ref.id, booking_ref.reference).await.unwrap().unwrap();
        let first = details.passengers[0].id;

        let update = BookingUpdate {
            meal: "Kosher".into(),
            contact: ContactDetails { email: "new@example.cl".into(), phone: "555".into() },
            names: vec![(first, "Samantha".into(), "Rivera-Lopez".into())],
        };
        assert!(repo.update_booking(booking_ref.id, booking_ref.reference, &update).await.unwrap());

        let details = repo.find_booking(booking_ref.id, booking_ref.reference).await.unwrap().unwrap();
        assert_eq!(details.booking.meal, "Kosher");
        assert_eq!(details.booking.email, "new@example.cl");
        assert_eq!(details.passengers[0].fname, "Samantha");
        assert_eq!(details.passengers[0].lname, "Rivera-Lopez");
        assert_eq!(details.passengers[1].fname, "Alex");
    }

    #[tokio::test]
    async fn test_update_cannot_touch_other_bookings_passengers() {
        let repo = repo().await;
        let mine = repo.create_booking(&new_booking(1, None, "3C")).await.unwrap();
        let theirs = repo.create_booking(&new_booking(1, None, "5A")).await.unwrap();
        let their_passenger = repo
            .find_booking(theirs.id, theirs.reference)
            .await
            .unwrap()
            .unwrap()
            .passengers[0]
            .id;

        let update = BookingUpdate {
            meal: "Vegan".into(),
            contact: ContactDetails { email: "a@b.c".into(), phone: "1".into() },
            names: vec![(their_passenger, "Hijacked".into(), "Name".into())],
        };
        assert!(repo.update_booking(mine.id, mine.reference, &update).await.unwrap());

        let theirs = repo.find_booking(theirs.id, theirs.reference).await.unwrap().unwrap();
        assert_eq!(theirs.passengers[0].fname, "Sam");
    }

    #[tokio::test]
    async fn test_cancel_removes_booking_and_passengers() {
        let repo = repo().await;
        let booking_ref = repo.create_booking(&new_booking(1, None, "3C")).await.unwrap();
        assert!(repo.cancel_booking(booking_ref.id, booking_ref.reference).await.unwrap());
        assert!(repo.find_booking(booking_ref.id, booking_ref.reference).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passenger")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let seat = SeatCode::parse("3C", &SeatLayout::default()).unwrap();
        assert!(!repo.seat_taken(Itinerary { depart: 1, ret: None }, &seat).await.unwrap());
    }

    async fn file_backed(name: &str) -> (SqliteBookingRepository, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("aerobook-{}-{}.db", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        let db = DbClient::new(&format!("sqlite://{}", path.display()), 5).await.unwrap();
        db.migrate().await.unwrap();
        (SqliteBookingRepository::new(db.pool), path)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_are_serialized() {
        let (repo, path) = file_backed("concurrent").await;
        let repo = std::sync::Arc::new(repo);

        let distinct: Vec<_> = (1..=20)
            .map(|row| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_booking(&new_booking(1, None, &format!("{}A", row))).await })
            })
            .collect();
        for handle in distinct {
            handle.await.unwrap().unwrap();
        }

        let same: Vec<_> = (0..20)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_booking(&new_booking(2, None, "1B")).await })
            })
            .collect();
        let mut committed = 0;
        for handle in same {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(CoreError::Conflict(msg)) => {
                    assert_eq!(msg, "Seat 1B has just been taken. Please choose another seat.")
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(committed, 1);
        assert_eq!(repo.taken_seats(Itinerary { depart: 1, ret: None }).await.unwrap().len(), 20);

        let _ = std::fs::remove_file(&path);
    }
}
