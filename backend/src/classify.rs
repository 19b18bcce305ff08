//! Call-site argument classification.
//!
//! Assigns each pending argument either the next free register of its
//! class or a stack slot, following the register budget of one native
//! calling convention.

use tramp_core::{Arg, ArgType};

/// Argument registers of one calling convention.
#[derive(Debug, Clone, Copy)]
pub struct RegisterBudget<'a, R> {
    pub int_regs: &'a [R],
    pub float_regs: &'a [R],
    /// Registers are chosen by argument position rather than by a
    /// per-class cursor (Microsoft x64: argument `i` uses slot `i` of
    /// whichever class it belongs to).
    pub positional: bool,
}

/// Where one argument travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement<R> {
    Reg(R),
    Stack,
}

/// Result of classifying one argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlan<R> {
    placements: Vec<Placement<R>>,
}

impl<R: Copy> CallPlan<R> {
    /// Classify `types` in order. `int_eligible` filters integer-class
    /// types that may travel in a register at all (IA-32 never passes
    /// 64-bit values in a single register); ineligible arguments do not
    /// consume a register.
    pub fn classify_types(
        types: impl IntoIterator<Item = ArgType>,
        budget: &RegisterBudget<'_, R>,
        int_eligible: impl Fn(ArgType) -> bool,
    ) -> Self {
        let mut placements = Vec::new();
        let (mut next_int, mut next_float) = (0usize, 0usize);

        for (i, ty) in types.into_iter().enumerate() {
            let placement = if ty.is_float() {
                let slot = if budget.positional { i } else { next_float };
                match budget.float_regs.get(slot) {
                    Some(&reg) => {
                        next_float += 1;
                        Placement::Reg(reg)
                    }
                    None => Placement::Stack,
                }
            } else if int_eligible(ty) {
                let slot = if budget.positional { i } else { next_int };
                match budget.int_regs.get(slot) {
                    Some(&reg) => {
                        next_int += 1;
                        Placement::Reg(reg)
                    }
                    None => Placement::Stack,
                }
            } else {
                Placement::Stack
            };
            placements.push(placement);
        }

        Self { placements }
    }

    pub fn classify(
        args: &[Arg],
        budget: &RegisterBudget<'_, R>,
        int_eligible: impl Fn(ArgType) -> bool,
    ) -> Self {
        Self::classify_types(args.iter().map(|a| a.ty), budget, int_eligible)
    }

    pub fn placements(&self) -> &[Placement<R>] {
        &self.placements
    }

    pub fn placement(&self, index: usize) -> Placement<R> {
        self.placements[index]
    }

    /// Register-assigned arguments in argument order.
    pub fn register_args(&self) -> impl Iterator<Item = (usize, R)> + '_ {
        self.placements.iter().enumerate().filter_map(|(i, p)| match p {
            Placement::Reg(r) => Some((i, *r)),
            Placement::Stack => None,
        })
    }

    /// Stack-passed arguments in push order (last argument first).
    pub fn stack_args_rev(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.placements.len())
            .rev()
            .filter(move |&i| matches!(self.placements[i], Placement::Stack))
    }

    pub fn stack_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Stack))
            .count()
    }

    pub fn float_reg_count(&self, args: &[Arg]) -> usize {
        self.register_args()
            .filter(|&(i, _)| args[i].is_float())
            .count()
    }
}
