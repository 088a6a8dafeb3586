use std::collections::HashMap;
use std::convert::Infallible;

use crate::transaction::OutPoint;
use crate::Error;

/// Previous output being spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

pub trait CoinView {
    type Error: Into<Error> + std::fmt::Debug;

    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, Self::Error>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCoinView {
    coins: HashMap<OutPoint, Coin>,
}

impl MemoryCoinView {
    pub fn new() -> Self {
        MemoryCoinView::default()
    }

    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) -> Option<Coin> {
        self.coins.insert(outpoint, coin)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

impl CoinView for MemoryCoinView {
    type Error = Infallible;

    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, Self::Error> {
        Ok(self.coins.get(outpoint).cloned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_memory_coin_view() {
        let mut view = MemoryCoinView::new();
        assert!(view.is_empty());

        let coin = Coin {
            value: 42,
            script_pubkey: vec![0x51],
        };
        assert_eq!(view.add_coin(OutPoint::null(), coin.clone()), None);
        assert_eq!(view.len(), 1);

        assert_eq!(view.get_coin(&OutPoint::null()).unwrap(), Some(coin));
        assert_eq!(view.get_coin(&OutPoint::new([1; 32], 0)).unwrap(), None);
    }
}
