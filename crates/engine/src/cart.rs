//! Transfer cart: the line items picked before submitting a transfer order.
//!
//! Quantities are entered as containers and loose pieces at the same time and
//! always stored in container units (`containers + pieces / multiplier`),
//! rounded to 4 decimals.

use api_types::{
    item::Item,
    transfer_order::{TransferLineNew, TransferOrderNew},
};

use crate::{
    EngineError, ResultEngine,
    units::{UnitInfo, round4},
};

/// Quantity typed by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuantityEntry {
    pub containers: f64,
    pub pieces: f64,
}

impl QuantityEntry {
    pub fn new(containers: f64, pieces: f64) -> Self {
        Self { containers, pieces }
    }

    pub fn containers(containers: f64) -> Self {
        Self::new(containers, 0.0)
    }

    pub fn pieces(pieces: f64) -> Self {
        Self::new(0.0, pieces)
    }

    /// Quantity in container units, the unit transfer orders are submitted in.
    pub fn total(&self, unit: &UnitInfo) -> f64 {
        round4(self.containers + self.pieces / f64::from(unit.multiplier))
    }

    pub fn total_pieces(&self, unit: &UnitInfo) -> f64 {
        round4(self.containers * f64::from(unit.multiplier) + self.pieces)
    }

    fn validate(&self, unit: &UnitInfo) -> ResultEngine<()> {
        let finite = self.containers.is_finite() && self.pieces.is_finite();
        if !finite || self.containers < 0.0 || self.pieces < 0.0 || self.total(unit) <= 0.0 {
            return Err(EngineError::Validation(
                "Please enter a valid quantity".to_string(),
            ));
        }
        Ok(())
    }

    /// Text shown in the cart, e.g. `48 pieces (2.0000 cartons)`.
    pub fn display_text(&self, unit: &UnitInfo) -> String {
        let total = self.total(unit);
        if !unit.has_conversion() {
            return format!("{} units", total);
        }

        let container = unit.container.plural();
        let pieces_total = self.total_pieces(unit);
        match (self.containers > 0.0, self.pieces > 0.0) {
            (false, _) => format!("{} pieces ({total:.4} {container})", self.pieces),
            (true, false) => format!(
                "{} {container} ({pieces_total} pieces)",
                self.containers
            ),
            (true, true) => format!(
                "{} {container} + {} pieces ({total:.4} {container}, {pieces_total} pieces)",
                self.containers, self.pieces
            ),
        }
    }

    /// Note attached to the remote line when loose pieces were converted.
    pub fn description(&self, unit: &UnitInfo) -> Option<String> {
        if !unit.has_conversion() || self.pieces <= 0.0 {
            return None;
        }
        let container = unit.container.plural();
        let total = self.total(unit);
        let original = if self.containers > 0.0 {
            format!("{} {container} + {} pieces", self.containers, self.pieces)
        } else {
            format!("{} pieces", self.pieces)
        };
        Some(format!(
            "Original: {original} (converted to {total:.4} {container})"
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub item_id: String,
    pub name: String,
    pub unit: UnitInfo,
    pub entry: QuantityEntry,
}

impl CartLine {
    pub fn quantity_transfer(&self) -> f64 {
        self.entry.total(&self.unit)
    }

    pub fn display_text(&self) -> String {
        self.entry.display_text(&self.unit)
    }

    pub fn description(&self) -> Option<String> {
        self.entry.description(&self.unit)
    }
}

/// Insertion ordered list of lines, one per item.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry` for `item`. Adding an item already in the cart sums the
    /// quantities on the existing line.
    pub fn add(&mut self, item: &Item, entry: QuantityEntry) -> ResultEngine<&CartLine> {
        let unit = item
            .unit
            .as_deref()
            .map(UnitInfo::parse)
            .unwrap_or_else(UnitInfo::flat);
        entry.validate(&unit)?;

        let index = match self.lines.iter().position(|l| l.item_id == item.item_id) {
            Some(index) => {
                let line = &mut self.lines[index];
                line.entry.containers += entry.containers;
                line.entry.pieces += entry.pieces;
                index
            }
            None => {
                self.lines.push(CartLine {
                    item_id: item.item_id.clone(),
                    name: item.name.clone(),
                    unit,
                    entry,
                });
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Builds the transfer order request for the current lines.
    pub fn to_order(
        &self,
        from_location_id: &str,
        to_location_id: &str,
        date: Option<String>,
    ) -> ResultEngine<TransferOrderNew> {
        let order = TransferOrderNew {
            from_location_id: from_location_id.to_string(),
            to_location_id: to_location_id.to_string(),
            date,
            line_items: self
                .lines
                .iter()
                .map(|line| TransferLineNew {
                    item_id: line.item_id.clone(),
                    quantity_transfer: line.quantity_transfer(),
                    description: line.description(),
                })
                .collect(),
        };
        crate::catalog::validate_order(&order)?;
        Ok(order)
    }
}
