//! Repository for the `listings` and `listing_features` tables.

use estate_core::listing::{ListingChanges, ListingRecord};
use estate_core::search::{ListingPredicate, PageWindow, SortSpec};
use estate_core::status::{ListingStatus, StatusId};
use estate_core::types::{DbId, Timestamp};
use estate_core::workflow::ReasonUpdate;
use sqlx::PgPool;

use crate::models::listing::ListingRow;
use crate::repositories::ListingImageRepo;

/// Column list for `listings l` SELECT queries. Feature tags are aggregated
/// from the join table so every read returns the full tag set.
const COLUMNS: &str = "\
    l.id, l.slug, l.title, l.description, l.property_type_id, l.transaction_kind_id, \
    l.price, l.currency, l.address, l.city, l.province, l.postal_code, \
    l.latitude, l.longitude, l.bedrooms, l.bathrooms, l.floor_area, \
    COALESCE((SELECT array_agg(f.tag ORDER BY f.tag) FROM listing_features f \
              WHERE f.listing_id = l.id), ARRAY[]::TEXT[]) AS features, \
    l.status_id, l.approval_status_id, l.rejection_reason, l.approved_at, l.approved_by, \
    l.published_at, l.featured_until, l.view_count, l.save_count, l.owner_id, l.agent_id, \
    l.deleted_at, l.created_at, l.updated_at";

/// Provides queries and writes for listings.
pub struct ListingRepo;

impl ListingRepo {
    /// Find a listing by id. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ListingRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM listings l WHERE l.id = $1 AND l.deleted_at IS NULL");
        sqlx::query_as::<_, ListingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a listing by slug. Excludes soft-deleted rows.
    pub async fn find_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<ListingRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM listings l WHERE l.slug = $1 AND l.deleted_at IS NULL");
        sqlx::query_as::<_, ListingRow>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Whether any listing other than `exclude_id` holds `slug`, soft-deleted
    /// rows included (the unique constraint covers them too).
    pub async fn slug_exists(
        pool: &PgPool,
        slug: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM listings WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    /// Insert a listing with its feature tags and images in one transaction,
    /// returning the stored row.
    pub async fn create(pool: &PgPool, input: &ListingRecord) -> Result<ListingRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO listings (slug, title, description, property_type_id, transaction_kind_id, \
                 price, currency, address, city, province, postal_code, latitude, longitude, \
                 bedrooms, bathrooms, floor_area, status_id, approval_status_id, owner_id, agent_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) \
             RETURNING id",
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.property_type.id())
        .bind(input.transaction_kind.id())
        .bind(input.price)
        .bind(&input.currency)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.province)
        .bind(&input.postal_code)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.bedrooms)
        .bind(input.bathrooms)
        .bind(input.floor_area)
        .bind(input.status.id())
        .bind(input.status.approval_status().id())
        .bind(input.owner_id)
        .bind(input.agent_id)
        .fetch_one(&mut *tx)
        .await?;

        if !input.features.is_empty() {
            sqlx::query(
                "INSERT INTO listing_features (listing_id, tag) \
                 SELECT $1, UNNEST($2::TEXT[]) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(&input.features)
            .execute(&mut *tx)
            .await?;
        }

        if !input.images.is_empty() {
            ListingImageRepo::replace_all(&mut *tx, id, &input.images).await?;
        }

        tx.commit().await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Apply content fields, the recomputed slug and an optional state change
    /// in a single `UPDATE`. Only `Some` fields are written. Feature tags and
    /// images, when present, replace the stored sets in the same transaction.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        changes: &ListingChanges,
    ) -> Result<Option<ListingRow>, sqlx::Error> {
        let state = changes.state.as_ref();
        let (write_reason, reason) = match state.map(|s| &s.rejection_reason) {
            Some(ReasonUpdate::Set(reason)) => (true, Some(reason.clone())),
            Some(ReasonUpdate::Clear) => (true, None),
            Some(ReasonUpdate::Keep) | None => (false, None),
        };
        let approval = state.and_then(|s| s.approval);

        let mut tx = pool.begin().await?;

        let updated: Option<DbId> = sqlx::query_scalar(
            "UPDATE listings SET
                slug = COALESCE($2, slug),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                property_type_id = COALESCE($5, property_type_id),
                transaction_kind_id = COALESCE($6, transaction_kind_id),
                price = COALESCE($7, price),
                currency = COALESCE($8, currency),
                address = COALESCE($9, address),
                city = COALESCE($10, city),
                province = COALESCE($11, province),
                postal_code = COALESCE($12, postal_code),
                latitude = COALESCE($13, latitude),
                longitude = COALESCE($14, longitude),
                bedrooms = COALESCE($15, bedrooms),
                bathrooms = COALESCE($16, bathrooms),
                floor_area = COALESCE($17, floor_area),
                status_id = COALESCE($18, status_id),
                approval_status_id = COALESCE($19, approval_status_id),
                rejection_reason = CASE WHEN $20 THEN $21 ELSE rejection_reason END,
                approved_by = COALESCE($22, approved_by),
                approved_at = COALESCE($23, approved_at),
                published_at = COALESCE(published_at, $24),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING id",
        )
        .bind(id)
        .bind(&changes.slug)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.property_type.map(|t| t.id()))
        .bind(changes.transaction_kind.map(|k| k.id()))
        .bind(changes.price)
        .bind(&changes.currency)
        .bind(&changes.address)
        .bind(&changes.city)
        .bind(&changes.province)
        .bind(&changes.postal_code)
        .bind(changes.latitude)
        .bind(changes.longitude)
        .bind(changes.bedrooms)
        .bind(changes.bathrooms)
        .bind(changes.floor_area)
        .bind(state.map(|s| s.status.id()))
        .bind(state.map(|s| s.approval_status.id()))
        .bind(write_reason)
        .bind(reason)
        .bind(approval.map(|(by, _)| by))
        .bind(approval.map(|(_, at)| at))
        .bind(state.and_then(|s| s.published_at))
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(features) = &changes.features {
            sqlx::query("DELETE FROM listing_features WHERE listing_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO listing_features (listing_id, tag) \
                 SELECT $1, UNNEST($2::TEXT[]) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(features)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(images) = &changes.images {
            ListingImageRepo::replace_all(&mut *tx, id, images).await?;
        }

        tx.commit().await?;
        Self::find_by_id(pool, id).await
    }

    /// Set or clear the featured window. Returns `None` for missing rows.
    pub async fn set_featured_until(
        pool: &PgPool,
        id: DbId,
        until: Option<Timestamp>,
    ) -> Result<Option<ListingRow>, sqlx::Error> {
        let updated: Option<DbId> = sqlx::query_scalar(
            "UPDATE listings SET featured_until = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING id",
        )
        .bind(id)
        .bind(until)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Soft-delete a listing by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE listings SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count an owner's live listings outside the terminal statuses.
    pub async fn count_active_for_owner(pool: &PgPool, owner_id: DbId) -> Result<i64, sqlx::Error> {
        let terminal: Vec<StatusId> = ListingStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.id())
            .collect();
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM listings \
             WHERE owner_id = $1 AND deleted_at IS NULL AND status_id <> ALL($2)",
        )
        .bind(owner_id)
        .bind(terminal)
        .fetch_one(pool)
        .await
    }

    /// Fetch one page of listings matching `predicate`.
    pub async fn search(
        pool: &PgPool,
        predicate: &ListingPredicate,
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<ListingRow>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_listing_filter(predicate);
        let dir = sort.order.keyword();
        let query = format!(
            "SELECT {COLUMNS} FROM listings l {where_clause} \
             ORDER BY l.{column} {dir} NULLS LAST, l.id {dir} \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
            column = sort.field.column(),
        );

        let q = bind_listing_values(sqlx::query_as::<_, ListingRow>(&query), &bind_values);
        q.bind(window.limit)
            .bind(window.offset)
            .fetch_all(pool)
            .await
    }

    /// Count listings matching `predicate` (for pagination metadata).
    pub async fn count(pool: &PgPool, predicate: &ListingPredicate) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_listing_filter(predicate);
        let query = format!("SELECT COUNT(*)::BIGINT FROM listings l {where_clause}");

        let q = bind_listing_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }
}

// ---------------------------------------------------------------------------
// Dynamic filter building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically built queries.
#[derive(Debug, Clone)]
enum BindValue {
    BigInt(i64),
    Int(i32),
    SmallInt(i16),
    Double(f64),
    Text(String),
    TextArray(Vec<String>),
    Timestamp(Timestamp),
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Build the WHERE clause and bind values for a listing predicate.
///
/// Returns `(where_clause, bind_values, next_bind_idx)`.
fn build_listing_filter(p: &ListingPredicate) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec!["l.deleted_at IS NULL".to_string()];
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    let mut push = |template: &dyn Fn(u32) -> String, value: BindValue| {
        conditions.push(template(bind_idx));
        bind_idx += 1;
        bind_values.push(value);
    };

    if let Some(status) = p.status {
        push(&|i| format!("l.status_id = ${i}"), BindValue::SmallInt(status.id()));
    }
    if let Some(kind) = p.property_type {
        push(&|i| format!("l.property_type_id = ${i}"), BindValue::SmallInt(kind.id()));
    }
    if let Some(kind) = p.transaction_kind {
        push(&|i| format!("l.transaction_kind_id = ${i}"), BindValue::SmallInt(kind.id()));
    }
    if let Some(city) = &p.city_contains {
        push(&|i| format!("l.city ILIKE ${i}"), BindValue::Text(like_pattern(city)));
    }
    if let Some(province) = &p.province_contains {
        push(&|i| format!("l.province ILIKE ${i}"), BindValue::Text(like_pattern(province)));
    }
    if let Some(min) = p.price.min {
        push(&|i| format!("l.price >= ${i}"), BindValue::BigInt(min));
    }
    if let Some(max) = p.price.max {
        push(&|i| format!("l.price <= ${i}"), BindValue::BigInt(max));
    }
    if let Some(min) = p.bedrooms.min {
        push(&|i| format!("l.bedrooms >= ${i}"), BindValue::Int(min));
    }
    if let Some(max) = p.bedrooms.max {
        push(&|i| format!("l.bedrooms <= ${i}"), BindValue::Int(max));
    }
    if let Some(min) = p.bathrooms.min {
        push(&|i| format!("l.bathrooms >= ${i}"), BindValue::Int(min));
    }
    if let Some(max) = p.bathrooms.max {
        push(&|i| format!("l.bathrooms <= ${i}"), BindValue::Int(max));
    }
    if let Some(min) = p.floor_area.min {
        push(&|i| format!("l.floor_area >= ${i}"), BindValue::Double(min));
    }
    if let Some(max) = p.floor_area.max {
        push(&|i| format!("l.floor_area <= ${i}"), BindValue::Double(max));
    }
    if let Some(text) = &p.text {
        push(
            &|i| {
                format!(
                    "(l.title ILIKE ${i} OR l.description ILIKE ${i} \
                      OR l.address ILIKE ${i} OR l.city ILIKE ${i})"
                )
            },
            BindValue::Text(like_pattern(text)),
        );
    }
    if !p.features_all.is_empty() {
        push(
            &|i| {
                format!(
                    "NOT EXISTS (SELECT 1 FROM UNNEST(${i}::TEXT[]) AS wanted(tag) \
                     WHERE NOT EXISTS (SELECT 1 FROM listing_features f \
                                       WHERE f.listing_id = l.id AND f.tag = wanted.tag))"
                )
            },
            BindValue::TextArray(p.features_all.clone()),
        );
    }
    if let Some(owner_id) = p.owner_id {
        push(&|i| format!("l.owner_id = ${i}"), BindValue::BigInt(owner_id));
    }
    if let Some(agent_id) = p.agent_id {
        push(&|i| format!("l.agent_id = ${i}"), BindValue::BigInt(agent_id));
    }
    if let Some(user_id) = p.participant {
        push(
            &|i| format!("(l.owner_id = ${i} OR l.agent_id = ${i})"),
            BindValue::BigInt(user_id),
        );
    }
    if let Some(now) = p.featured_at {
        push(&|i| format!("l.featured_until > ${i}"), BindValue::Timestamp(now));
    }
    if let Some(bounds) = &p.bounds {
        push(&|i| format!("l.latitude >= ${i}"), BindValue::Double(bounds.min_lat));
        push(&|i| format!("l.latitude <= ${i}"), BindValue::Double(bounds.max_lat));

        let mut ranges = Vec::new();
        for (lo, hi) in bounds.lng_ranges() {
            ranges.push(format!(
                "l.longitude BETWEEN ${bind_idx} AND ${}",
                bind_idx + 1
            ));
            bind_idx += 2;
            bind_values.push(BindValue::Double(lo));
            bind_values.push(BindValue::Double(hi));
        }
        conditions.push(format!("({})", ranges.join(" OR ")));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_listing_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        q = match val {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::Int(v) => q.bind(*v),
            BindValue::SmallInt(v) => q.bind(*v),
            BindValue::Double(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v.as_str()),
            BindValue::TextArray(v) => q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_listing_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        q = match val {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::Int(v) => q.bind(*v),
            BindValue::SmallInt(v) => q.bind(*v),
            BindValue::Double(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v.as_str()),
            BindValue::TextArray(v) => q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}
