//! In-process ledger that plays the exchange's contracts for tests.
//!
//! Calldata is dispatched on the target address and function selector, the
//! same way a node would route it, so client code runs unmodified against
//! it. Every submitted transaction is mined immediately.

use crate::config::ClientConfig;
use crate::contracts::{selectors, IERC20, IFactory, ILimitOrder, IRouter};
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::order::{Order, OrderId, OrderStatus};
use crate::types::{Address, Bytes, Receipt, TxHash, U256};
use alloy::primitives::{keccak256, Log};
use alloy::sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// A transaction submitted through [`Ledger::send`].
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub to: Address,
    pub input: Bytes,
    pub tx: TxHash,
}

struct MockToken {
    name: String,
    symbol: String,
    decimals: u8,
}

#[derive(Default)]
struct State {
    tokens: HashMap<Address, MockToken>,
    pairs: HashSet<(Address, Address)>,
    pair_lookups: usize,
    /// (token, owner, spender) -> amount
    allowances: HashMap<(Address, Address, Address), U256>,
    /// (token, owner) -> amount
    balances: HashMap<(Address, Address), U256>,
    amounts_out: Option<Vec<U256>>,
    last_amounts_out: Option<(U256, Vec<Address>)>,
    rejected_approvals: HashSet<Address>,
    reverted_approvals: HashSet<Address>,
    sent: Vec<SentTransaction>,
    deployments: Vec<Bytes>,
    fail_deployments: bool,
    orders: BTreeMap<U256, Order>,
    last_order_id: U256,
    fillable: HashMap<U256, U256>,
    suppress_order_events: bool,
    receipts: HashMap<TxHash, Receipt>,
    nonce: u64,
}

impl State {
    fn mine(&mut self, success: bool, contract_address: Option<Address>, logs: Vec<Log>) -> TxHash {
        self.nonce += 1;
        let tx_hash = keccak256(self.nonce.to_be_bytes());
        self.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                success,
                contract_address,
                logs,
            },
        );
        tx_hash
    }

    fn check_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<(), DexError> {
        let allowance = self.allowances.get(&(token, owner, spender)).copied().unwrap_or_default();
        if allowance < amount {
            return Err(revert("insufficient allowance"));
        }
        Ok(())
    }

    /// Draw down an allowance the way `transferFrom` does.
    fn spend(&mut self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<(), DexError> {
        self.check_allowance(token, owner, spender, amount)?;
        let allowance = self.allowances.entry((token, owner, spender)).or_default();
        *allowance -= amount;
        Ok(())
    }

    fn settle(&mut self, id: U256, status: OrderStatus) -> Result<(), DexError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| revert("order does not exist"))?;
        if order.status != OrderStatus::Open {
            return Err(revert("order not open"));
        }
        order.status = status;
        self.fillable.remove(&id);
        Ok(())
    }
}

/// Mock ledger with a factory, a router, an order book and any number of
/// tokens.
pub struct MockLedger {
    account: Address,
    factory: Address,
    router: Address,
    limit_order: Address,
    state: RwLock<State>,
}

impl fmt::Debug for MockLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockLedger")
            .field("account", &self.account)
            .field("factory", &self.factory)
            .field("router", &self.router)
            .field("limit_order", &self.limit_order)
            .finish_non_exhaustive()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            account: Address::repeat_byte(0x11),
            factory: Address::repeat_byte(0xfa),
            router: Address::repeat_byte(0xfb),
            limit_order: Address::repeat_byte(0xfc),
            state: RwLock::new(State::default()),
        }
    }

    /// Client config pointing at the mock's core contracts.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default().with_contracts(Some(self.factory), self.router, self.limit_order)
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn limit_order(&self) -> Address {
        self.limit_order
    }

    /// Create a token contract and return its address.
    pub fn add_token(&self, name: &str, symbol: &str, decimals: u8) -> Address {
        let mut state = self.state.write();
        let address = derived_address(format!("token-{}", state.tokens.len()));
        state.tokens.insert(
            address,
            MockToken {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
        address
    }

    pub fn add_pair(&self, a: Address, b: Address) {
        self.state.write().pairs.insert(pair_key(a, b));
    }

    /// Number of `getPair` reads served so far.
    pub fn pair_lookups(&self) -> usize {
        self.state.read().pair_lookups
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .write()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.write().balances.insert((token, owner), amount);
    }

    /// Fix the router's `getAmountsOut` answer. Unset, it echoes the input
    /// amount once per path element.
    pub fn set_amounts_out(&self, amounts: Vec<U256>) {
        self.state.write().amounts_out = Some(amounts);
    }

    pub fn last_amounts_out_request(&self) -> Option<(U256, Vec<Address>)> {
        self.state.read().last_amounts_out.clone()
    }

    /// Refuse `approve` submissions for `token` before they reach a block.
    pub fn reject_approvals_for(&self, token: Address) {
        self.state.write().rejected_approvals.insert(token);
    }

    /// Mine `approve` submissions for `token` with a failed status.
    pub fn revert_approvals_for(&self, token: Address) {
        self.state.write().reverted_approvals.insert(token);
    }

    /// Mine deployments without a contract address.
    pub fn fail_deployments(&self, fail: bool) {
        self.state.write().fail_deployments = fail;
    }

    /// Whether `createOrder` receipts carry an `OrderCreated` log.
    pub fn emit_order_events(&self, emit: bool) {
        self.state.write().suppress_order_events = !emit;
    }

    /// Make the order book report `id` as fillable for `amount_out`.
    pub fn set_fillable(&self, id: OrderId, amount_out: U256) {
        self.state.write().fillable.insert(id.0, amount_out);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state.read().sent.clone()
    }

    /// Creation code of every deployment, in submission order.
    pub fn deployments(&self) -> Vec<Bytes> {
        self.state.read().deployments.clone()
    }

    /// Submitted approvals as `(token, spender, amount)`.
    pub fn approvals(&self) -> Vec<(Address, Address, U256)> {
        self.sent_calls::<IERC20::approveCall>(selectors::APPROVE)
            .into_iter()
            .map(|(token, call)| (token, call.spender, call.amount))
            .collect()
    }

    pub fn swaps(&self) -> Vec<IRouter::swapExactTokensForTokensCall> {
        self.sent_calls(selectors::SWAP_EXACT_TOKENS)
            .into_iter()
            .map(|(_, call)| call)
            .collect()
    }

    pub fn liquidity_calls(&self) -> Vec<IRouter::addLiquidityCall> {
        self.sent_calls(selectors::ADD_LIQUIDITY)
            .into_iter()
            .map(|(_, call)| call)
            .collect()
    }

    fn sent_calls<C: SolCall>(&self, selector: [u8; 4]) -> Vec<(Address, C)> {
        self.state
            .read()
            .sent
            .iter()
            .filter(|sent| sent.input.starts_with(&selector))
            .filter_map(|sent| C::abi_decode(&sent.input).ok().map(|call| (sent.to, call)))
            .collect()
    }

    fn factory_call(&self, input: &[u8]) -> Result<Vec<u8>, DexError> {
        let call = IFactory::getPairCall::abi_decode(input)?;
        let mut state = self.state.write();
        state.pair_lookups += 1;
        let key = pair_key(call.tokenA, call.tokenB);
        let pair = if state.pairs.contains(&key) {
            derived_address(format!("pair-{}-{}", key.0, key.1))
        } else {
            Address::ZERO
        };
        Ok(pair.abi_encode())
    }

    fn router_call(&self, input: &[u8]) -> Result<Vec<u8>, DexError> {
        match IRouter::IRouterCalls::abi_decode(input)? {
            IRouter::IRouterCalls::factory(_) => Ok(self.factory.abi_encode()),
            IRouter::IRouterCalls::getAmountsOut(call) => {
                let mut state = self.state.write();
                let amounts = state
                    .amounts_out
                    .clone()
                    .unwrap_or_else(|| vec![call.amountIn; call.path.len()]);
                state.last_amounts_out = Some((call.amountIn, call.path));
                Ok(amounts.abi_encode())
            }
            _ => Err(revert("router: not a view function")),
        }
    }

    fn token_call(&self, token: Address, input: &[u8]) -> Result<Vec<u8>, DexError> {
        let state = self.state.read();
        let meta = state
            .tokens
            .get(&token)
            .ok_or_else(|| revert(format!("no contract at {token}")))?;
        match IERC20::IERC20Calls::abi_decode(input)? {
            IERC20::IERC20Calls::name(_) => Ok(meta.name.abi_encode()),
            IERC20::IERC20Calls::symbol(_) => Ok(meta.symbol.abi_encode()),
            IERC20::IERC20Calls::decimals(_) => {
                Ok(IERC20::decimalsCall::abi_encode_returns(&meta.decimals))
            }
            IERC20::IERC20Calls::balanceOf(call) => Ok(state
                .balances
                .get(&(token, call.account))
                .copied()
                .unwrap_or_default()
                .abi_encode()),
            IERC20::IERC20Calls::allowance(call) => Ok(state
                .allowances
                .get(&(token, call.owner, call.spender))
                .copied()
                .unwrap_or_default()
                .abi_encode()),
            IERC20::IERC20Calls::approve(_) => Err(revert("approve is not a view function")),
        }
    }

    fn order_book_call(&self, input: &[u8]) -> Result<Vec<u8>, DexError> {
        let state = self.state.read();
        match ILimitOrder::ILimitOrderCalls::abi_decode(input)? {
            ILimitOrder::ILimitOrderCalls::orders(call) => {
                // Unknown ids read as an all-zero record, like a storage mapping
                let record = match state.orders.get(&call.orderId) {
                    Some(order) => ILimitOrder::ordersReturn {
                        id: order.id.0,
                        maker: order.maker,
                        tokenIn: order.token_in,
                        tokenOut: order.token_out,
                        amountIn: order.amount_in,
                        minOut: order.min_out,
                        expireAt: U256::from(order.expire_at),
                        status: order.status.code(),
                    },
                    None => ILimitOrder::ordersReturn {
                        id: U256::ZERO,
                        maker: Address::ZERO,
                        tokenIn: Address::ZERO,
                        tokenOut: Address::ZERO,
                        amountIn: U256::ZERO,
                        minOut: U256::ZERO,
                        expireAt: U256::ZERO,
                        status: 0,
                    },
                };
                Ok(ILimitOrder::ordersCall::abi_encode_returns(&record))
            }
            ILimitOrder::ILimitOrderCalls::nextOrderId(_) => Ok(state.last_order_id.abi_encode()),
            ILimitOrder::ILimitOrderCalls::isFillable(call) => {
                let answer = match state.fillable.get(&call.orderId) {
                    Some(amount_out) => (true, *amount_out),
                    None => (false, U256::ZERO),
                };
                Ok(answer.abi_encode_params())
            }
            _ => Err(revert("order book: not a view function")),
        }
    }

    fn expect_target(&self, to: Address, expected: Address, name: &str) -> Result<(), DexError> {
        if to != expected {
            return Err(revert(format!("{name} function sent to {to}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn account(&self) -> Address {
        self.account
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DexError> {
        let output = if to == self.factory {
            self.factory_call(&input)?
        } else if to == self.router {
            self.router_call(&input)?
        } else if to == self.limit_order {
            self.order_book_call(&input)?
        } else {
            self.token_call(to, &input)?
        };
        Ok(output.into())
    }

    async fn send(&self, to: Address, input: Bytes) -> Result<TxHash, DexError> {
        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("calldata too short for function selector"))?;

        let mut state = self.state.write();
        let mut logs = Vec::new();

        let success = match selector {
            selectors::APPROVE => {
                let call = IERC20::approveCall::abi_decode(&input)?;
                if !state.tokens.contains_key(&to) {
                    return Err(revert(format!("no contract at {to}")));
                }
                if state.rejected_approvals.contains(&to) {
                    return Err(revert("approval rejected"));
                }
                if state.reverted_approvals.contains(&to) {
                    false
                } else {
                    state
                        .allowances
                        .insert((to, self.account, call.spender), call.amount);
                    true
                }
            }
            selectors::ADD_LIQUIDITY => {
                self.expect_target(to, self.router, "router")?;
                let call = IRouter::addLiquidityCall::abi_decode(&input)?;
                // Both transfers succeed or neither does
                state.check_allowance(call.tokenA, self.account, to, call.amountADesired)?;
                state.check_allowance(call.tokenB, self.account, to, call.amountBDesired)?;
                state.spend(call.tokenA, self.account, to, call.amountADesired)?;
                state.spend(call.tokenB, self.account, to, call.amountBDesired)?;
                state.pairs.insert(pair_key(call.tokenA, call.tokenB));
                true
            }
            selectors::SWAP_EXACT_TOKENS => {
                self.expect_target(to, self.router, "router")?;
                let call = IRouter::swapExactTokensForTokensCall::abi_decode(&input)?;
                let token_in = call.path.first().copied().unwrap_or_default();
                state.spend(token_in, self.account, to, call.amountIn)?;
                true
            }
            selectors::CREATE_ORDER => {
                self.expect_target(to, self.limit_order, "order book")?;
                let call = ILimitOrder::createOrderCall::abi_decode(&input)?;
                state.spend(call.tokenIn, self.account, to, call.amountIn)?;
                state.last_order_id += U256::from(1u64);
                let id = state.last_order_id;

                if !state.suppress_order_events {
                    let event = ILimitOrder::OrderCreated {
                        orderId: id,
                        maker: self.account,
                        tokenIn: call.tokenIn,
                        tokenOut: call.tokenOut,
                        amountIn: call.amountIn,
                        minOut: call.minOut,
                        expireAt: call.expireAt,
                    };
                    logs.push(Log {
                        address: to,
                        data: event.encode_log_data(),
                    });
                }

                state.orders.insert(
                    id,
                    Order {
                        id: OrderId(id),
                        maker: self.account,
                        token_in: call.tokenIn,
                        token_out: call.tokenOut,
                        amount_in: call.amountIn,
                        min_out: call.minOut,
                        expire_at: call.expireAt.saturating_to(),
                        status: OrderStatus::Open,
                    },
                );
                true
            }
            selectors::FILL_ORDER => {
                self.expect_target(to, self.limit_order, "order book")?;
                let call = ILimitOrder::fillOrderCall::abi_decode(&input)?;
                state.settle(call.orderId, OrderStatus::Filled)?;
                true
            }
            selectors::CANCEL_ORDER => {
                self.expect_target(to, self.limit_order, "order book")?;
                let call = ILimitOrder::cancelOrderCall::abi_decode(&input)?;
                state.settle(call.orderId, OrderStatus::Cancelled)?;
                true
            }
            _ => {
                return Err(revert(format!(
                    "unknown function selector: 0x{}",
                    alloy::hex::encode(selector)
                )))
            }
        };

        let tx = state.mine(success, None, logs);
        state.sent.push(SentTransaction { to, input, tx });
        Ok(tx)
    }

    async fn deploy(&self, code: Bytes) -> Result<TxHash, DexError> {
        let mut state = self.state.write();
        state.deployments.push(code);
        let contract_address = if state.fail_deployments {
            None
        } else {
            Some(derived_address(format!("deployment-{}", state.deployments.len())))
        };
        Ok(state.mine(true, contract_address, Vec::new()))
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, DexError> {
        self.state
            .read()
            .receipts
            .get(&tx)
            .cloned()
            .ok_or_else(|| revert(format!("unknown transaction {tx}")))
    }
}

fn revert(message: impl fmt::Display) -> DexError {
    DexError::Transport(TransportErrorKind::custom_str(&message.to_string()))
}

fn pair_key(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn derived_address(seed: String) -> Address {
    Address::from_slice(&keccak256(seed)[12..])
}
