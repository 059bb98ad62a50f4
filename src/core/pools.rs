//! Pool-budget ledger - pool ceilings, spend aggregation and admission control.
//!
//! Money is stored as two-decimal `f64` but every sum and comparison here is
//! done in integer cents, so repeated small spends never drift past a ceiling.
//!
//! Two aggregation scopes exist side by side:
//! - [`available`] takes its ceiling from the single most recent income in the
//!   cycle and subtracts the pool's spend across all of the user's incomes.
//! - [`total_for_cycle`], [`list_by_explicit_range`] and [`income_pools`] sum
//!   ceilings over every income in range.

use crate::{
    core::cycle::{Cycle, resolve_cycle},
    entities::{Income, LineItem, Pool, income, line_item},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    QueryOrder,
    prelude::*,
    sea_query::{Expr, Query},
};
use serde::Serialize;

/// Share of an income, in percent, assigned to each pool before rounding.
pub const BURN_PERCENT: i64 = 20;
/// Share of an income, in percent, assigned to the invest pool.
pub const INVEST_PERCENT: i64 = 30;
/// Share of an income, in percent, assigned to the commit pool.
pub const COMMIT_PERCENT: i64 = 50;

/// Converts a money amount to whole cents, rounding half away from zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Converts whole cents back to a money amount.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// The three integer ceilings derived from one income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolSplit {
    /// Burn ceiling
    pub burn: i64,
    /// Invest ceiling
    pub invest: i64,
    /// Commit ceiling
    pub commit: i64,
}

impl PoolSplit {
    /// Ceiling for one pool.
    #[must_use]
    pub const fn ceiling(&self, pool: Pool) -> i64 {
        match pool {
            Pool::Burn => self.burn,
            Pool::Invest => self.invest,
            Pool::Commit => self.commit,
        }
    }

    /// Sum of the three ceilings.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.burn + self.invest + self.commit
    }
}

impl From<&income::Model> for PoolSplit {
    fn from(income: &income::Model) -> Self {
        Self {
            burn: income.burn_pool,
            invest: income.invest_pool,
            commit: income.commit_pool,
        }
    }
}

/// Splits an income 20/30/50 into whole-unit pool ceilings.
///
/// Each share is floored, then the difference between the amount and the
/// floored total is rounded half to even and added to the commit pool, so
/// 0.5 splits to nothing and 100.5 to 20/30/50.
#[must_use]
pub fn compute_pools(amount: f64) -> PoolSplit {
    let cents = to_cents(amount);
    let floor_share = |percent: i64| (cents * percent).div_euclid(100 * 100);

    let burn = floor_share(BURN_PERCENT);
    let invest = floor_share(INVEST_PERCENT);
    let commit = floor_share(COMMIT_PERCENT);

    let remainder_cents = cents - (burn + invest + commit) * 100;
    let remainder = round_cents_half_even(remainder_cents);

    PoolSplit {
        burn,
        invest,
        commit: commit + remainder,
    }
}

/// Rounds whole cents to whole units, ties to the even unit.
fn round_cents_half_even(cents: i64) -> i64 {
    let units = cents.div_euclid(100);
    match cents.rem_euclid(100) {
        fraction if fraction > 50 => units + 1,
        50 if units % 2 != 0 => units + 1,
        _ => units,
    }
}

/// What is left to spend from a pool in a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    /// Most recent income in the cycle; new line items are attached to it
    pub income: income::Model,
    /// Pool being queried
    pub pool: Pool,
    /// Ceiling of `pool` on `income`
    pub ceiling: i64,
    /// Sum of the pool's line items dated in the cycle
    pub spent: f64,
    /// `ceiling - spent`, may be negative after an income edit
    pub remaining: f64,
    /// Cycle the figures refer to
    pub cycle: Cycle,
}

/// Remaining allowance for `pool` in the cycle enclosing `today`.
///
/// Returns `Ok(None)` when the user has no income dated in that cycle, which
/// means no budget is established and dependent writes must be rejected.
pub async fn available<C>(
    db: &C,
    user_id: &str,
    pool: Pool,
    today: NaiveDate,
) -> Result<Option<Availability>>
where
    C: ConnectionTrait,
{
    available_in(db, user_id, pool, resolve_cycle(today)).await
}

/// Same as [`available`] for an already resolved cycle.
pub async fn available_in<C>(
    db: &C,
    user_id: &str,
    pool: Pool,
    cycle: Cycle,
) -> Result<Option<Availability>>
where
    C: ConnectionTrait,
{
    let Some(income) = latest_income_in(db, user_id, cycle).await? else {
        return Ok(None);
    };

    let ceiling = PoolSplit::from(&income).ceiling(pool);
    let spent_cents = spent_cents(db, user_id, pool, cycle).await?;

    Ok(Some(Availability {
        income,
        pool,
        ceiling,
        spent: from_cents(spent_cents),
        remaining: from_cents(ceiling * 100 - spent_cents),
        cycle,
    }))
}

/// Single admission gate for all three pools.
///
/// `previous_amount` is the pre-edit amount of the item being changed, or zero
/// for a new item. Fails with [`Error::InsufficientPool`] when
/// `new_amount > remaining + previous_amount`; otherwise returns what would be
/// left after the write.
pub fn validate_and_apply(
    pool: Pool,
    new_amount: f64,
    remaining: f64,
    previous_amount: f64,
) -> Result<f64> {
    let allowance = to_cents(remaining) + to_cents(previous_amount);
    let requested = to_cents(new_amount);

    if requested > allowance {
        tracing::warn!(
            "Rejected {pool} write of {new_amount:.2}: only {:.2} available",
            from_cents(allowance)
        );
        return Err(Error::InsufficientPool {
            pool,
            remaining: from_cents(allowance),
            requested: new_amount,
        });
    }

    Ok(from_cents(allowance - requested))
}

/// Aggregated view of one pool over a date range.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatement {
    /// Pool being reported
    pub pool: Pool,
    /// Dates covered, inclusive
    pub range: Cycle,
    /// Sum of the pool's ceiling over every income dated in range
    pub pool_ceiling: i64,
    /// Sum of the pool's line items dated in range
    pub spent: f64,
    /// `pool_ceiling - spent`
    pub remaining: f64,
    /// Line items, newest first
    pub items: Vec<line_item::Model>,
}

/// Statement for `pool` over the cycle enclosing `today`.
pub async fn total_for_cycle(
    db: &DatabaseConnection,
    user_id: &str,
    pool: Pool,
    today: NaiveDate,
) -> Result<PoolStatement> {
    list_by_explicit_range(db, user_id, pool, resolve_cycle(today)).await
}

/// Statement for `pool` over a caller-supplied range. No cycle resolution is
/// applied; the range is used as given.
pub async fn list_by_explicit_range(
    db: &DatabaseConnection,
    user_id: &str,
    pool: Pool,
    range: Cycle,
) -> Result<PoolStatement> {
    let incomes = incomes_in(db, user_id, range).await?;
    if incomes.is_empty() {
        return Err(Error::NoIncomeInCycle {
            start: range.start,
            end: range.end,
        });
    }

    let pool_ceiling: i64 = incomes
        .iter()
        .map(|income| PoolSplit::from(income).ceiling(pool))
        .sum();
    let items = items_in(db, user_id, pool, range).await?;
    let spent_cents: i64 = items.iter().map(|item| to_cents(item.amount)).sum();

    Ok(PoolStatement {
        pool,
        range,
        pool_ceiling,
        spent: from_cents(spent_cents),
        remaining: from_cents(pool_ceiling * 100 - spent_cents),
        items,
    })
}

/// Summed income and ceilings for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct IncomePools {
    /// Cycle being reported
    pub cycle: Cycle,
    /// Sum of income amounts
    pub income: f64,
    /// Number of incomes that contributed
    pub income_count: usize,
    /// Summed ceilings
    pub pools: PoolSplit,
}

/// Summed income and pool ceilings for the cycle enclosing `today`.
pub async fn income_pools(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<IncomePools> {
    let cycle = resolve_cycle(today);
    let incomes = incomes_in(db, user_id, cycle).await?;
    if incomes.is_empty() {
        return Err(Error::NoIncomeInCycle {
            start: cycle.start,
            end: cycle.end,
        });
    }

    let income_cents: i64 = incomes.iter().map(|income| to_cents(income.amount)).sum();
    let pools = incomes.iter().fold(
        PoolSplit {
            burn: 0,
            invest: 0,
            commit: 0,
        },
        |acc, income| PoolSplit {
            burn: acc.burn + income.burn_pool,
            invest: acc.invest + income.invest_pool,
            commit: acc.commit + income.commit_pool,
        },
    );

    Ok(IncomePools {
        cycle,
        income: from_cents(income_cents),
        income_count: incomes.len(),
        pools,
    })
}

/// Bumps the revision of every income `user_id` has in `cycle` and returns
/// how many were touched.
///
/// Must be the first statement of an admission transaction: the transaction
/// then holds the database write lock before it reads any allowance, and a
/// second writer waits for the commit instead of reading a stale total.
pub(crate) async fn lock_cycle<C>(db: &C, user_id: &str, cycle: Cycle) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Income::update_many()
        .col_expr(
            income::Column::Revision,
            Expr::col(income::Column::Revision).add(1),
        )
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::IncomeDate.between(cycle.start, cycle.end))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Bumps the revision of the income funding `item_id`, under the same rule as
/// [`lock_cycle`].
pub(crate) async fn lock_item_income<C>(db: &C, item_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let funding = Query::select()
        .column(line_item::Column::IncomeId)
        .from(LineItem)
        .and_where(line_item::Column::Id.eq(item_id))
        .to_owned();

    let result = Income::update_many()
        .col_expr(
            income::Column::Revision,
            Expr::col(income::Column::Revision).add(1),
        )
        .filter(income::Column::Id.in_subquery(funding))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found("line item", item_id));
    }
    Ok(())
}

pub(crate) async fn latest_income_in<C>(
    db: &C,
    user_id: &str,
    cycle: Cycle,
) -> Result<Option<income::Model>>
where
    C: ConnectionTrait,
{
    Income::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::IncomeDate.between(cycle.start, cycle.end))
        .order_by_desc(income::Column::IncomeDate)
        .order_by_desc(income::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn incomes_in<C>(db: &C, user_id: &str, range: Cycle) -> Result<Vec<income::Model>>
where
    C: ConnectionTrait,
{
    Income::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::IncomeDate.between(range.start, range.end))
        .all(db)
        .await
        .map_err(Into::into)
}

async fn items_in<C>(
    db: &C,
    user_id: &str,
    pool: Pool,
    range: Cycle,
) -> Result<Vec<line_item::Model>>
where
    C: ConnectionTrait,
{
    LineItem::find()
        .inner_join(Income)
        .filter(income::Column::UserId.eq(user_id))
        .filter(line_item::Column::Pool.eq(pool))
        .filter(line_item::Column::ItemDate.between(range.start, range.end))
        .order_by_desc(line_item::Column::ItemDate)
        .order_by_desc(line_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn spent_cents<C>(db: &C, user_id: &str, pool: Pool, range: Cycle) -> Result<i64>
where
    C: ConnectionTrait,
{
    let items = items_in(db, user_id, pool, range).await?;
    Ok(items.iter().map(|item| to_cents(item.amount)).sum())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_compute_pools_examples() {
        assert_eq!(
            compute_pools(100.0),
            PoolSplit {
                burn: 20,
                invest: 30,
                commit: 50
            }
        );
        assert_eq!(
            compute_pools(101.0),
            PoolSplit {
                burn: 20,
                invest: 30,
                commit: 51
            }
        );
        // 1234.56: floors are 246, 370, 617 (1233); remainder 1.56 rounds to 2
        assert_eq!(
            compute_pools(1234.56),
            PoolSplit {
                burn: 246,
                invest: 370,
                commit: 619
            }
        );
    }

    #[test]
    fn test_compute_pools_sums_to_rounded_amount() {
        for cents in (1..200_000).step_by(7) {
            let amount = from_cents(cents);
            let split = compute_pools(amount);
            if cents % 100 != 50 {
                assert_eq!(split.total(), amount.round() as i64, "amount {amount}");
            }
            assert!(split.burn >= 0 && split.invest >= 0 && split.commit >= 0);
        }
        assert_eq!(compute_pools(2.49).total(), 2);
        assert_eq!(compute_pools(2.51).total(), 3);
    }

    #[test]
    fn test_compute_pools_half_remainder_rounds_to_even() {
        // 0.5: floors 0/0/0, remainder 0.5 rounds to 0
        assert_eq!(compute_pools(0.5), PoolSplit::default());
        // 100.5: floors 20/30/50, remainder 0.5 rounds to 0
        assert_eq!(
            compute_pools(100.5),
            PoolSplit {
                burn: 20,
                invest: 30,
                commit: 50
            }
        );
        // 2.5: floors 0/0/1, remainder 1.5 rounds to 2
        assert_eq!(compute_pools(2.5).total(), 3);
        // 4.5: floors 0/1/2, remainder 1.5 rounds to 2
        assert_eq!(
            compute_pools(4.5),
            PoolSplit {
                burn: 0,
                invest: 1,
                commit: 4
            }
        );
        // 7.5: floors 1/2/3, remainder 1.5 rounds to 2
        assert_eq!(compute_pools(7.5).total(), 8);
        assert_eq!(round_cents_half_even(250), 2);
        assert_eq!(round_cents_half_even(350), 4);
        assert_eq!(round_cents_half_even(-50), 0);
        assert_eq!(round_cents_half_even(-150), -2);
    }

    #[test]
    fn test_validate_and_apply() {
        assert_eq!(validate_and_apply(Pool::Burn, 5.0, 5.0, 0.0).unwrap(), 0.0);
        assert_eq!(
            validate_and_apply(Pool::Burn, 8.0, 0.0, 5.0)
                .unwrap_err()
                .kind(),
            crate::errors::ErrorKind::InsufficientPool
        );
        assert_eq!(validate_and_apply(Pool::Burn, 8.0, 15.0, 5.0).unwrap(), 12.0);

        match validate_and_apply(Pool::Invest, 6.0, 5.0, 0.0) {
            Err(Error::InsufficientPool {
                pool,
                remaining,
                requested,
            }) => {
                assert_eq!(pool, Pool::Invest);
                assert_eq!(remaining, 5.0);
                assert_eq!(requested, 6.0);
            }
            other => panic!("expected InsufficientPool, got {other:?}"),
        }

        // Cent-level comparison, no float drift
        assert!(validate_and_apply(Pool::Commit, 0.3, 0.1 + 0.2, 0.0).is_ok());
    }

    #[tokio::test]
    async fn test_available_without_income_is_none() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;

        let result = available(&db, "u1", Pool::Burn, date(2025, 3, 10)).await?;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_available_uses_latest_income_and_all_spend() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);

        // Cycle 2025-02-25..2025-03-24
        let first = create_test_income(&db, "u1", 100.0, date(2025, 2, 26)).await?;
        let second = create_test_income(&db, "u1", 200.0, date(2025, 3, 1)).await?;
        insert_test_item(&db, first.id, Pool::Burn, 7.0, date(2025, 3, 2)).await?;
        insert_test_item(&db, second.id, Pool::Burn, 3.0, date(2025, 3, 3)).await?;

        let avail = available(&db, "u1", Pool::Burn, today).await?.unwrap();
        assert_eq!(avail.income.id, second.id);
        assert_eq!(avail.ceiling, 40);
        assert_eq!(avail.spent, 10.0);
        assert_eq!(avail.remaining, 30.0);
        assert_eq!(avail.cycle.start, date(2025, 2, 25));
        Ok(())
    }

    #[tokio::test]
    async fn test_statement_aggregates_all_incomes_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);

        let first = create_test_income(&db, "u1", 100.0, date(2025, 2, 26)).await?;
        let second = create_test_income(&db, "u1", 200.0, date(2025, 3, 1)).await?;
        insert_test_item(&db, first.id, Pool::Invest, 10.0, date(2025, 3, 2)).await?;
        insert_test_item(&db, second.id, Pool::Invest, 5.5, date(2025, 3, 8)).await?;
        // Out of cycle and other pool, both ignored
        insert_test_item(&db, first.id, Pool::Invest, 99.0, date(2025, 2, 20)).await?;
        insert_test_item(&db, first.id, Pool::Burn, 1.0, date(2025, 3, 2)).await?;

        let statement = total_for_cycle(&db, "u1", Pool::Invest, today).await?;
        assert_eq!(statement.pool_ceiling, 90);
        assert_eq!(statement.spent, 15.5);
        assert_eq!(statement.remaining, 74.5);
        assert_eq!(statement.items.len(), 2);
        assert_eq!(statement.items[0].item_date, date(2025, 3, 8));
        assert_eq!(statement.items[1].item_date, date(2025, 3, 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_explicit_range_skips_cycle_resolution() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;

        let income = create_test_income(&db, "u1", 100.0, date(2025, 1, 5)).await?;
        insert_test_item(&db, income.id, Pool::Commit, 12.0, date(2025, 1, 6)).await?;
        insert_test_item(&db, income.id, Pool::Commit, 8.0, date(2025, 1, 30)).await?;

        let range = Cycle::new(date(2025, 1, 1), date(2025, 1, 10))?;
        let statement = list_by_explicit_range(&db, "u1", Pool::Commit, range).await?;
        assert_eq!(statement.range, range);
        assert_eq!(statement.pool_ceiling, 50);
        assert_eq!(statement.spent, 12.0);
        assert_eq!(statement.items.len(), 1);

        let empty = Cycle::new(date(2024, 6, 1), date(2024, 6, 30))?;
        let err = list_by_explicit_range(&db, "u1", Pool::Commit, empty)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoIncomeInCycle { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_income_pools_sum_cycle_incomes() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 100.0, date(2025, 2, 26)).await?;
        create_test_income(&db, "u1", 101.0, date(2025, 3, 1)).await?;
        create_test_income(&db, "u1", 500.0, date(2025, 1, 1)).await?;

        let report = income_pools(&db, "u1", date(2025, 3, 10)).await?;
        assert_eq!(report.income, 201.0);
        assert_eq!(report.income_count, 2);
        assert_eq!(report.pools.burn, 40);
        assert_eq!(report.pools.invest, 60);
        assert_eq!(report.pools.commit, 101);

        let err = income_pools(&db, "u1", date(2025, 6, 1)).await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_cycle_bumps_in_cycle_revisions() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let cycle = resolve_cycle(date(2025, 3, 10));
        let current = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        let older = create_test_income(&db, "u1", 100.0, date(2025, 2, 1)).await?;

        assert_eq!(lock_cycle(&db, "u1", cycle).await?, 1);
        assert_eq!(lock_cycle(&db, "u1", cycle).await?, 1);
        let reloaded = Income::find_by_id(current.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.revision, current.revision + 2);
        let untouched = Income::find_by_id(older.id).one(&db).await?.unwrap();
        assert_eq!(untouched.revision, older.revision);

        assert_eq!(lock_cycle(&db, "nobody", cycle).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_item_income_follows_the_item() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let income = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        let item = insert_test_item(&db, income.id, Pool::Burn, 5.0, date(2025, 3, 2)).await?;

        lock_item_income(&db, item.id).await?;
        let reloaded = Income::find_by_id(income.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.revision, income.revision + 1);

        assert!(matches!(
            lock_item_income(&db, 9999).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
