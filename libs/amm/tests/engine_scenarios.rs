//! End-to-end engine scenarios against the in-memory ledger

use cpmm_engine::oracle::encode_price;
use cpmm_engine::{
    AccountId, AmmEngine, AmmError, AssetId, AssetLedger, ConstantProductMath, DepositBounds,
    EventLog, InMemoryLedger, ManualClock, PoolEvent, PoolId, TransferError, MINIMUM_LIQUIDITY,
    U256,
};
use rust_decimal_macros::dec;

const TOKEN_A: AssetId = AssetId::new([0x11; 20]);
const TOKEN_B: AssetId = AssetId::new([0x22; 20]);
const ALICE: AccountId = AccountId::new([0xa1; 20]);
const BOB: AccountId = AccountId::new([0xb0; 20]);
const CAROL: AccountId = AccountId::new([0xc0; 20]);

const FUNDING: u128 = 1_000_000_000;

struct Harness {
    engine: AmmEngine<InMemoryLedger>,
    clock: ManualClock,
    events: EventLog,
    pool_id: PoolId,
}

impl Harness {
    fn new() -> Self {
        let mut ledger = InMemoryLedger::new();
        for account in [ALICE, BOB, CAROL] {
            ledger.credit(TOKEN_A, account, FUNDING).unwrap();
            ledger.credit(TOKEN_B, account, FUNDING).unwrap();
        }

        let clock = ManualClock::new(1_000);
        let events = EventLog::new(256);
        let mut engine = AmmEngine::new(ledger, clock.clone());
        engine.add_sink(Box::new(events.clone()));
        let pool_id = engine.create_pool(TOKEN_A, TOKEN_B).unwrap();

        Self {
            engine,
            clock,
            events,
            pool_id,
        }
    }

    fn seeded(amount_a: u128, amount_b: u128) -> Self {
        let mut harness = Self::new();
        harness.deposit(ALICE, amount_a, amount_b).unwrap();
        harness
    }

    fn deposit(&mut self, provider: AccountId, amount_a: u128, amount_b: u128) -> cpmm_engine::Result<u128> {
        let pool_id = self.pool_id;
        self.engine
            .add_liquidity(provider, &pool_id, DepositBounds::exact(amount_a, amount_b), provider)
            .map(|receipt| receipt.shares)
    }

    fn balance(&self, asset: AssetId, account: AccountId) -> u128 {
        self.engine.ledger().balance_of(&asset, &account)
    }

    fn custody(&self) -> AccountId {
        self.pool_id.custody_account()
    }

    fn reserves(&self) -> (u128, u128) {
        self.engine.get_reserves(&self.pool_id).unwrap()
    }
}

#[test]
fn test_reference_swap_against_thousand_reserves() {
    let mut h = Harness::new();
    let pool_id = h.pool_id;
    let custody = h.custody();

    // A genesis deposit of (1000, 1000) cannot mint, so seed reserves directly
    h.engine.ledger_mut().transfer(&TOKEN_A, &CAROL, &custody, 1000).unwrap();
    h.engine.ledger_mut().transfer(&TOKEN_B, &CAROL, &custody, 1000).unwrap();
    assert_eq!(h.engine.sync(&pool_id).unwrap(), (1000, 1000));

    let receipt = h
        .engine
        .swap_exact_in(BOB, &pool_id, TOKEN_A, 100, 90, BOB)
        .unwrap();

    assert_eq!(receipt.amount_out, 90);
    assert_eq!(receipt.asset_out, TOKEN_B);
    assert_eq!(h.reserves(), (1100, 910));
    assert_eq!(h.balance(TOKEN_B, BOB), FUNDING + 90);
    assert_eq!(h.balance(TOKEN_A, BOB), FUNDING - 100);
}

#[test]
fn test_genesis_at_minimum_liquidity_is_rejected_without_side_effects() {
    let mut h = Harness::new();

    assert_eq!(h.deposit(ALICE, 1000, 1000), Err(AmmError::ZeroLiquidityMinted));

    assert_eq!(h.reserves(), (0, 0));
    assert_eq!(h.engine.total_shares(&h.pool_id).unwrap(), 0);
    assert_eq!(h.balance(TOKEN_A, ALICE), FUNDING);
    assert_eq!(h.balance(TOKEN_B, ALICE), FUNDING);
    assert_eq!(h.balance(TOKEN_A, h.custody()), 0);
}

#[test]
fn test_genesis_mints_and_locks_minimum() {
    let h = Harness::seeded(1_000_000, 1_000_000);

    assert_eq!(h.engine.get_user_liquidity(&h.pool_id, &ALICE).unwrap(), 999_000);
    assert_eq!(
        h.engine.get_user_liquidity(&h.pool_id, &AccountId::ZERO).unwrap(),
        MINIMUM_LIQUIDITY
    );
    assert_eq!(h.engine.total_shares(&h.pool_id).unwrap(), 1_000_000);
    assert_eq!(h.balance(TOKEN_A, h.custody()), 1_000_000);
}

#[test]
fn test_duplicate_pool_rejected_in_either_order() {
    let mut h = Harness::new();

    assert_eq!(
        h.engine.create_pool(TOKEN_A, TOKEN_B),
        Err(AmmError::PoolAlreadyExists(h.pool_id))
    );
    assert_eq!(
        h.engine.create_pool(TOKEN_B, TOKEN_A),
        Err(AmmError::PoolAlreadyExists(h.pool_id))
    );
    assert_eq!(h.engine.pool_count(), 1);
    assert_eq!(h.engine.get_pool_id(TOKEN_B, TOKEN_A), h.pool_id);
    assert!(h.engine.pool_exists(&h.pool_id));
}

#[test]
fn test_swap_grows_constant_product_and_matches_quote() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    let (reserve_a, reserve_b) = h.reserves();
    let quoted = h.engine.quote_exact_in(&pool_id, &TOKEN_A, 100_000).unwrap();
    let receipt = h
        .engine
        .swap_exact_in(BOB, &pool_id, TOKEN_A, 100_000, quoted, CAROL)
        .unwrap();

    assert_eq!(receipt.amount_out, quoted);
    assert_eq!(
        quoted,
        ConstantProductMath::quote_out(100_000, reserve_a, reserve_b).unwrap()
    );

    let (after_a, after_b) = h.reserves();
    assert!(after_a * after_b > reserve_a * reserve_b);
    assert_eq!(h.balance(TOKEN_B, CAROL), FUNDING + quoted);
}

#[test]
fn test_swap_slippage_leaves_no_trace() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;
    let before = h.engine.pool_snapshot(&pool_id).unwrap();
    let events_before = h.events.len();

    let quoted = h.engine.quote_exact_in(&pool_id, &TOKEN_B, 5_000).unwrap();
    assert_eq!(
        h.engine
            .swap_exact_in(BOB, &pool_id, TOKEN_B, 5_000, quoted + 1, BOB),
        Err(AmmError::SlippageExceeded {
            actual: quoted,
            minimum: quoted + 1
        })
    );

    assert_eq!(h.engine.pool_snapshot(&pool_id).unwrap(), before);
    assert_eq!(h.balance(TOKEN_B, BOB), FUNDING);
    assert_eq!(h.events.len(), events_before);
}

#[test]
fn test_swap_exact_out() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    let required = h.engine.quote_exact_out(&pool_id, &TOKEN_B, 1_000).unwrap();
    assert_eq!(
        h.engine
            .swap_exact_out(BOB, &pool_id, TOKEN_B, 1_000, required - 1, BOB),
        Err(AmmError::ExcessiveInput {
            required,
            maximum: required - 1
        })
    );

    let receipt = h
        .engine
        .swap_exact_out(BOB, &pool_id, TOKEN_B, 1_000, required, BOB)
        .unwrap();
    assert_eq!(receipt.amount_in, required);
    assert_eq!(receipt.amount_out, 1_000);
    assert_eq!(h.balance(TOKEN_A, BOB), FUNDING + 1_000);
    assert_eq!(h.balance(TOKEN_B, BOB), FUNDING - required);
}

#[test]
fn test_invalid_asset_and_unknown_pool() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;
    let stranger = AssetId::new([0x33; 20]);

    assert_eq!(
        h.engine.swap_exact_in(BOB, &pool_id, stranger, 10, 0, BOB),
        Err(AmmError::InvalidAsset {
            pool: pool_id,
            asset: stranger
        })
    );

    let missing = h.engine.get_pool_id(TOKEN_A, stranger);
    assert_eq!(
        h.engine.swap_exact_in(BOB, &missing, TOKEN_A, 10, 0, BOB),
        Err(AmmError::PoolNotFound(missing))
    );
    assert_eq!(h.engine.get_reserves(&missing), Err(AmmError::PoolNotFound(missing)));
    assert!(!h.engine.pool_exists(&missing));
}

#[test]
fn test_proportional_deposit_and_round_trip() {
    let mut h = Harness::seeded(2_000_000, 3_000_000);
    let pool_id = h.pool_id;
    let total_before = h.engine.total_shares(&pool_id).unwrap();

    // 10% of each reserve
    let shares = h.deposit(BOB, 200_000, 300_000).unwrap();
    assert_eq!(shares, total_before / 10);

    let receipt = h.engine.burn(BOB, &pool_id, shares, BOB).unwrap();
    assert!(receipt.amount_a <= 200_000);
    assert!(receipt.amount_b <= 300_000);
    assert_eq!(h.engine.get_user_liquidity(&pool_id, &BOB).unwrap(), 0);
    assert_eq!(h.engine.total_shares(&pool_id).unwrap(), total_before);
}

#[test]
fn test_add_liquidity_uses_binding_side() {
    let mut h = Harness::seeded(1_000_000, 2_000_000);
    let pool_id = h.pool_id;

    let receipt = h
        .engine
        .add_liquidity(
            BOB,
            &pool_id,
            DepositBounds {
                desired_a: 10_000,
                desired_b: 50_000,
                min_a: 0,
                min_b: 0,
            },
            BOB,
        )
        .unwrap();

    assert_eq!((receipt.amount_a, receipt.amount_b), (10_000, 20_000));
    assert_eq!(h.balance(TOKEN_B, BOB), FUNDING - 20_000);

    assert_eq!(
        h.engine.add_liquidity(
            BOB,
            &pool_id,
            DepositBounds {
                desired_a: 10_000,
                desired_b: 50_000,
                min_a: 0,
                min_b: 20_001,
            },
            BOB,
        ),
        Err(AmmError::SlippageB {
            actual: 20_000,
            minimum: 20_001
        })
    );
}

#[test]
fn test_remove_liquidity_bounds() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    assert_eq!(
        h.engine
            .remove_liquidity(ALICE, &pool_id, 1_000, 1_001, 0, ALICE),
        Err(AmmError::SlippageA {
            actual: 1_000,
            minimum: 1_001
        })
    );
    assert_eq!(
        h.engine
            .remove_liquidity(ALICE, &pool_id, 1_000, 0, 1_001, ALICE),
        Err(AmmError::SlippageB {
            actual: 1_000,
            minimum: 1_001
        })
    );
    assert_eq!(h.engine.get_user_liquidity(&pool_id, &ALICE).unwrap(), 999_000);

    let receipt = h
        .engine
        .remove_liquidity(ALICE, &pool_id, 1_000, 1_000, 1_000, CAROL)
        .unwrap();
    assert_eq!((receipt.amount_a, receipt.amount_b), (1_000, 1_000));
    assert_eq!(h.balance(TOKEN_A, CAROL), FUNDING + 1_000);
    assert_eq!(h.reserves(), (999_000, 999_000));
}

#[test]
fn test_burn_rejections() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    assert_eq!(
        h.engine.burn(BOB, &pool_id, 1, BOB),
        Err(AmmError::InsufficientShares {
            owner: BOB,
            available: 0,
            requested: 1
        })
    );
    assert_eq!(
        h.engine.burn(AccountId::ZERO, &pool_id, 1, BOB),
        Err(AmmError::LockedLiquidity)
    );
    assert_eq!(
        h.engine.burn(ALICE, &pool_id, 0, ALICE),
        Err(AmmError::ZeroLiquidityBurned)
    );
}

#[test]
fn test_direct_transfer_absorbed_by_next_operation() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;
    let custody = h.custody();

    h.engine
        .ledger_mut()
        .transfer(&TOKEN_A, &CAROL, &custody, 100_000)
        .unwrap();
    assert_eq!(h.reserves(), (1_000_000, 1_000_000));

    // Burn pays out of custodied balances, so the gift goes to holders
    let receipt = h.engine.burn(ALICE, &pool_id, 999_000, ALICE).unwrap();
    assert_eq!((receipt.amount_a, receipt.amount_b), (1_098_900, 999_000));
    assert_eq!(h.reserves(), (1_100, 1_000));
}

#[test]
fn test_mint_after_external_deposit() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;
    let custody = h.custody();

    h.engine.ledger_mut().transfer(&TOKEN_A, &BOB, &custody, 50_000).unwrap();
    h.engine.ledger_mut().transfer(&TOKEN_B, &BOB, &custody, 50_000).unwrap();

    let receipt = h.engine.mint(&pool_id, BOB).unwrap();
    assert_eq!((receipt.amount_a, receipt.amount_b), (50_000, 50_000));
    assert_eq!(receipt.shares, 50_000);
    assert_eq!(h.engine.get_user_liquidity(&pool_id, &BOB).unwrap(), 50_000);
    assert_eq!(h.reserves(), (1_050_000, 1_050_000));

    // Nothing new in custody
    assert_eq!(h.engine.mint(&pool_id, BOB), Err(AmmError::ZeroLiquidityMinted));
}

#[test]
fn test_failed_second_leg_rolls_back_first() {
    let mut ledger = InMemoryLedger::new();
    ledger.credit(TOKEN_A, BOB, 10_000).unwrap();
    let mut engine = AmmEngine::new(ledger, ManualClock::new(0));
    let pool_id = engine.create_pool(TOKEN_A, TOKEN_B).unwrap();

    // Asset A moves into custody, asset B overdraws
    assert_eq!(
        engine.add_liquidity(BOB, &pool_id, DepositBounds::exact(10_000, 10_000), BOB),
        Err(AmmError::Transfer(TransferError::InsufficientBalance {
            asset: TOKEN_B,
            holder: BOB,
            available: 0,
            requested: 10_000
        }))
    );
    assert_eq!(engine.ledger().balance_of(&TOKEN_A, &BOB), 10_000);
    assert_eq!(
        engine.ledger().balance_of(&TOKEN_A, &pool_id.custody_account()),
        0
    );
    assert_eq!(engine.get_reserves(&pool_id).unwrap(), (0, 0));
}

#[test]
fn test_transfer_shares_then_withdraw() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    h.engine.transfer_shares(&pool_id, ALICE, BOB, 100_000).unwrap();
    assert_eq!(h.engine.get_user_liquidity(&pool_id, &BOB).unwrap(), 100_000);
    assert_eq!(
        h.engine.transfer_shares(&pool_id, AccountId::ZERO, BOB, 1),
        Err(AmmError::LockedLiquidity)
    );

    let receipt = h.engine.burn(BOB, &pool_id, 100_000, BOB).unwrap();
    assert_eq!((receipt.amount_a, receipt.amount_b), (100_000, 100_000));
}

#[test]
fn test_time_weighted_average_price() {
    let mut h = Harness::seeded(1_000_000, 4_000_000);
    let pool_id = h.pool_id;

    let start = h.engine.observe(&pool_id).unwrap();
    h.clock.advance(60);

    let (price_a, price_b, window) = h.engine.consult(&pool_id, &start).unwrap();
    assert_eq!(window.elapsed, 60);
    assert_eq!(price_a.quote(1_000).unwrap(), 4_000);
    assert_eq!(price_a.to_decimal(), Some(dec!(4)));
    assert_eq!(price_b.quote(1_000).unwrap(), 250);
    assert_eq!(h.engine.spot_price(&pool_id, &TOKEN_A).unwrap(), dec!(4));

    // The pool itself is only updated by mutating calls
    assert_eq!(h.engine.pool(&pool_id).unwrap().last_update_timestamp(), 1_000);
    assert_eq!(
        h.engine.consult(&pool_id, &h.engine.observe(&pool_id).unwrap()),
        Err(AmmError::EmptyObservationWindow)
    );
}

#[test]
fn test_swap_accumulates_over_pre_swap_reserves() {
    let mut h = Harness::seeded(1_000_000, 4_000_000);
    let pool_id = h.pool_id;
    let (pre_a, pre_b) = h.reserves();

    h.clock.advance(30);
    h.engine
        .swap_exact_in(BOB, &pool_id, TOKEN_A, 100_000, 0, BOB)
        .unwrap();

    let elapsed = U256::from(30u32);
    let pool = h.engine.pool(&pool_id).unwrap();
    assert_eq!(pool.last_update_timestamp(), 1_030);
    assert_eq!(
        pool.price_cumulatives(),
        (
            encode_price(pre_b, pre_a) * elapsed,
            encode_price(pre_a, pre_b) * elapsed
        )
    );
    assert_ne!(h.reserves(), (pre_a, pre_b));
}

#[test]
fn test_swap_to_custody_account_is_rejected() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;
    let custody = h.custody();
    let before = h.engine.pool_snapshot(&pool_id).unwrap();

    assert_eq!(
        h.engine.swap_exact_in(BOB, &pool_id, TOKEN_A, 10_000, 0, custody),
        Err(AmmError::InvalidRecipient(custody))
    );
    assert_eq!(
        h.engine.swap_exact_out(BOB, &pool_id, TOKEN_A, 1_000, u128::MAX, custody),
        Err(AmmError::InvalidRecipient(custody))
    );
    assert_eq!(
        h.engine.burn(ALICE, &pool_id, 1_000, custody),
        Err(AmmError::InvalidRecipient(custody))
    );

    assert_eq!(h.engine.pool_snapshot(&pool_id).unwrap(), before);
    assert_eq!(h.balance(TOKEN_A, BOB), FUNDING);
    assert_eq!(h.engine.get_user_liquidity(&pool_id, &ALICE).unwrap(), 999_000);
}

#[test]
fn test_event_stream_for_lifecycle() {
    let mut h = Harness::seeded(1_000_000, 1_000_000);
    let pool_id = h.pool_id;

    h.engine
        .swap_exact_in(BOB, &pool_id, TOKEN_A, 1_000, 0, BOB)
        .unwrap();
    h.engine.burn(ALICE, &pool_id, 1_000, ALICE).unwrap();

    let kinds: Vec<&str> = h
        .events
        .events()
        .iter()
        .map(|event| match event {
            PoolEvent::PoolCreated { .. } => "created",
            PoolEvent::LiquidityAdded { .. } => "added",
            PoolEvent::LiquidityRemoved { .. } => "removed",
            PoolEvent::SwapExecuted { .. } => "swap",
            PoolEvent::Synced { .. } => "sync",
        })
        .collect();
    assert_eq!(
        kinds,
        ["created", "sync", "added", "sync", "swap", "sync", "removed"]
    );
}
