use aerobook_core::repository::FlightRepository;
use aerobook_core::{CoreError, CoreResult, FareClass, Flight, FlightQuery, NewFlight};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use tracing::info;

pub struct SqliteFlightRepository {
    pool: SqlitePool,
}

impl SqliteFlightRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    num: i64,
    city_from: String,
    city_to: String,
    depart_date: NaiveDate,
    arrival_date: NaiveDate,
    depart_time: NaiveTime,
    arrival_time: NaiveTime,
    duration: String,
    fclass: String,
    price: i64,
}

impl TryFrom<FlightRow> for Flight {
    type Error = CoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        let fclass = row
            .fclass
            .parse::<FareClass>()
            .map_err(|_| CoreError::Internal(format!("Flight {} has unknown fare class {}", row.num, row.fclass)))?;

        Ok(Flight {
            num: row.num,
            city_from: row.city_from,
            city_to: row.city_to,
            depart_date: row.depart_date,
            arrival_date: row.arrival_date,
            depart_time: row.depart_time,
            arrival_time: row.arrival_time,
            duration: row.duration,
            fclass,
            price: row.price,
        })
    }
}

const SELECT_FLIGHT: &str = r#"
    SELECT num, city_from, city_to, depart_date, arrival_date,
           depart_time, arrival_time, duration, fclass, price
    FROM flight
"#;

fn into_flights(rows: Vec<FlightRow>) -> CoreResult<Vec<Flight>> {
    rows.into_iter().map(Flight::try_from).collect()
}

#[async_trait]
impl FlightRepository for SqliteFlightRepository {
    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "{} ORDER BY depart_date, depart_time, num",
            SELECT_FLIGHT
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        into_flights(rows)
    }

    async fn get_flight(&self, num: i64) -> CoreResult<Option<Flight>> {
        sqlx::query_as::<_, FlightRow>(&format!("{} WHERE num = ?", SELECT_FLIGHT))
            .bind(num)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?
            .map(Flight::try_from)
            .transpose()
    }

    async fn search_flights(&self, query: &FlightQuery) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            r#"{}
            WHERE city_from = ? COLLATE NOCASE
              AND city_to = ? COLLATE NOCASE
              AND depart_date = ?
              AND fclass = ?
            ORDER BY depart_time, num"#,
            SELECT_FLIGHT
        ))
        .bind(&query.city_from)
        .bind(&query.city_to)
        .bind(query.date)
        .bind(query.fclass.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        into_flights(rows)
    }

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight> {
        let duration = flight.duration();

        let num = sqlx::query(
            r#"
            INSERT INTO flight (city_from, city_to, depart_date, arrival_date,
                                depart_time, arrival_time, duration, fclass, price)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&flight.city_from)
        .bind(&flight.city_to)
        .bind(flight.depart_date)
        .bind(flight.arrival_date)
        .bind(flight.depart_time)
        .bind(flight.arrival_time)
        .bind(&duration)
        .bind(flight.fclass.as_str())
        .bind(flight.price)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?
        .last_insert_rowid();

        info!("Flight {} created: {} -> {}", num, flight.city_from, flight.city_to);

        Ok(Flight {
            num,
            city_from: flight.city_from.clone(),
            city_to: flight.city_to.clone(),
            depart_date: flight.depart_date,
            arrival_date: flight.arrival_date,
            depart_time: flight.depart_time,
            arrival_time: flight.arrival_time,
            duration,
            fclass: flight.fclass,
            price: flight.price,
        })
    }

    async fn update_flight(&self, num: i64, flight: &NewFlight) -> CoreResult<Option<Flight>> {
        let result = sqlx::query(
            r#"
            UPDATE flight
            SET city_from = ?, city_to = ?, depart_date = ?, arrival_date = ?,
                depart_time = ?, arrival_time = ?, duration = ?, fclass = ?, price = ?
            WHERE num = ?
            "#,
        )
        .bind(&flight.city_from)
        .bind(&flight.city_to)
        .bind(flight.depart_date)
        .bind(flight.arrival_date)
        .bind(flight.depart_time)
        .bind(flight.arrival_time)
        .bind(flight.duration())
        .bind(flight.fclass.as_str())
        .bind(flight.price)
        .bind(num)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!("Flight {} updated", num);
        self.get_flight(num).await
    }

    async fn delete_flight(&self, num: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM flight WHERE num = ?")
            .bind(num)
            .execute(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Flight {} deleted", num);
        }
        Ok(deleted)
    }
}
