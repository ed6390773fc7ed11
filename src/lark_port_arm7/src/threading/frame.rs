//! The saved context of a suspended task.
use core::mem::size_of;
use lark_portkit::critical::NO_CRITICAL_NESTING;
use memoffset::offset_of;

use super::cfg::TaskMode;
use crate::arm::{Psr, PSR};

/// The offset between the address of an interrupted instruction and the
/// return address the IRQ exception leaves in `lr`.
pub const INSTRUCTION_SIZE: u32 = 4;

/// The value `lr` holds when a task starts.
const INITIAL_LR: u32 = 0xaaaa_aaaa;

#[doc = svgbobdoc::transform!(
/// The saved context of a suspended task, as pushed onto the task's stack by
/// the exception entry code.
///
/// <center>
/// ```svgbob
///                        higher addresses
///               +----------------------------+
///               |  return address            |  resume address + 4
///               +----------------------------+
///               |  r14                       |
///               |  r13                       |  task sp before the push
///               |  r12 ... r1                |
///               |  r0                        |
///               +----------------------------+
///               |  SPSR                      |
///               +----------------------------+
///  saved sp --> |  critical nesting depth    |
///               +----------------------------+
///                        lower addresses
/// ```
/// </center>
///
/// An IRQ leaves `lr` pointing 4 bytes past the instruction to resume, so
/// that is what the frame stores. A voluntary yield adjusts `lr` to match,
/// letting a single restore path (`subs pc, lr, #4`) serve both.
)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFrame {
    pub critical_nesting: u32,
    pub spsr: u32,
    pub r: [u32; 13],
    pub sp: u32,
    pub lr: u32,
    pub return_address: u32,
}

/// The register state of a task as seen by the task itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub r: [u32; 13],
    pub sp: u32,
    pub lr: u32,
    /// The address of the next instruction to execute.
    pub pc: u32,
    pub cpsr: u32,
}

impl ContextFrame {
    pub const WORDS: usize = size_of::<Self>() / 4;

    /// The offset of `return_address` relative to `r[0]`.
    pub const RETURN_ADDRESS_FROM_R0: usize =
        offset_of!(ContextFrame, return_address) - offset_of!(ContextFrame, r);

    /// Construct the frame of a task that has not run yet.
    pub fn initial(entry_point: u32, argument: u32, stack_top: u32, mode: TaskMode) -> Self {
        let mut spsr = Psr::new(0);
        // IRQ and FIQ unmasked
        spsr.modify(PSR::M.val(mode.psr_mode()));
        if entry_point & 1 != 0 {
            spsr.modify(PSR::T::SET);
        }

        let mut r = [0; 13];
        r[0] = argument;
        for (i, reg) in r.iter_mut().enumerate().skip(1) {
            // 0x01010101, ..., 0x09090909, 0x10101010, ..., 0x12121212
            let digits = (i / 10 * 16 + i % 10) as u32;
            *reg = digits * 0x0101_0101;
        }

        Self {
            critical_nesting: NO_CRITICAL_NESTING,
            spsr: spsr.get(),
            r,
            sp: stack_top,
            lr: INITIAL_LR,
            return_address: entry_point.wrapping_add(INSTRUCTION_SIZE),
        }
    }

    /// Capture `regs` as it would be saved by an IRQ taken just before
    /// `regs.pc`.
    pub fn from_registers(regs: &Registers, critical_nesting: u32) -> Self {
        Self {
            critical_nesting,
            spsr: regs.cpsr,
            r: regs.r,
            sp: regs.sp,
            lr: regs.lr,
            return_address: regs.pc.wrapping_add(INSTRUCTION_SIZE),
        }
    }

    /// Get the register state the restore path delivers.
    pub fn to_registers(&self) -> Registers {
        Registers {
            r: self.r,
            sp: self.sp,
            lr: self.lr,
            pc: self.return_address.wrapping_sub(INSTRUCTION_SIZE),
            cpsr: self.spsr,
        }
    }

    #[inline]
    pub fn spsr(&self) -> Psr {
        Psr::new(self.spsr)
    }

    /// Push `self` onto a full-descending stack. Returns the new stack
    /// pointer.
    ///
    /// # Safety
    ///
    /// The [`Self::WORDS`] words below `sp` must be writable.
    #[inline]
    pub unsafe fn push(self, sp: *mut u32) -> *mut u32 {
        unsafe {
            let sp = sp.sub(Self::WORDS);
            sp.cast::<Self>().write(self);
            sp
        }
    }

    /// Pop a frame off a full-descending stack. Returns the frame and the
    /// new stack pointer.
    ///
    /// # Safety
    ///
    /// `sp` must point to a frame written by [`Self::push`] (or by the
    /// assembly code following the same layout).
    #[inline]
    pub unsafe fn pop(sp: *const u32) -> (Self, *const u32) {
        unsafe { (sp.cast::<Self>().read(), sp.add(Self::WORDS)) }
    }
}

/// Write the initial context of a task into `stack` and return the stack
/// pointer to be stored in the task's `TaskState`.
///
/// The stack top is rounded down to 8 bytes as required by AAPCS.
///
/// # Panics
///
/// Panics if `stack` can't hold a [`ContextFrame`].
pub fn initialize_stack(
    stack: &mut [u32],
    entry_point: usize,
    argument: usize,
    mode: TaskMode,
) -> *mut u32 {
    let misalignment = (stack.as_ptr_range().end as usize % 8) / 4;
    assert!(
        stack.len() >= ContextFrame::WORDS + misalignment,
        "the stack is too small to hold the initial context"
    );

    let top = stack.len() - misalignment;
    let stack = &mut stack[..top];
    let stack_top = stack.as_mut_ptr_range().end;

    let frame = ContextFrame::initial(
        entry_point as u32,
        argument as u32,
        stack_top as usize as u32,
        mode,
    );

    // Safety: The length was checked above
    unsafe { frame.push(stack_top) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Registers {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut r = [0; 13];
            r.iter_mut().for_each(|x| *x = u32::arbitrary(g));
            Self {
                r,
                sp: u32::arbitrary(g),
                lr: u32::arbitrary(g),
                pc: u32::arbitrary(g),
                cpsr: u32::arbitrary(g),
            }
        }
    }

    #[test]
    fn layout() {
        assert_eq!(ContextFrame::WORDS, 18);
        assert_eq!(offset_of!(ContextFrame, critical_nesting), 0);
        assert_eq!(offset_of!(ContextFrame, spsr), 4);
        assert_eq!(offset_of!(ContextFrame, r), 8);
        assert_eq!(offset_of!(ContextFrame, sp), 60);
        assert_eq!(ContextFrame::RETURN_ADDRESS_FROM_R0, 60);
    }

    #[test]
    fn initial_frame() {
        let frame = ContextFrame::initial(0x0040_1000, 42, 0x0041_0000, TaskMode::System);
        assert_eq!(frame.critical_nesting, NO_CRITICAL_NESTING);
        assert_eq!(frame.spsr, 0x1f);
        assert_eq!(frame.r[0], 42);
        assert_eq!(frame.r[1], 0x0101_0101);
        assert_eq!(frame.r[9], 0x0909_0909);
        assert_eq!(frame.r[10], 0x1010_1010);
        assert_eq!(frame.r[12], 0x1212_1212);
        assert_eq!(frame.sp, 0x0041_0000);
        assert_eq!(frame.lr, 0xaaaa_aaaa);
        assert_eq!(frame.return_address, 0x0040_1004);

        let frame = ContextFrame::initial(0x0040_2001, 0, 0x0041_0000, TaskMode::User);
        assert!(frame.spsr().is_set(PSR::T));
        assert!(!frame.spsr().is_set(PSR::I));
        assert!(!frame.spsr().is_set(PSR::F));
        assert_eq!(frame.spsr().read(PSR::M), 0x10);
    }

    #[test]
    fn initialize_stack_respects_alignment() {
        let mut stack = [0u32; 64];
        let sp = initialize_stack(&mut stack, 0x100, 7, TaskMode::System);
        let range = stack.as_ptr_range();
        assert!(range.start <= sp as *const u32);

        let (frame, after) = unsafe { ContextFrame::pop(sp) };
        assert!(after <= range.end);
        assert_eq!(after as usize % 8, 0);
        assert_eq!(frame.sp, after as usize as u32);
        assert_eq!(frame.r[0], 7);
    }

    #[test]
    #[should_panic(expected = "the stack is too small")]
    fn initialize_stack_too_small() {
        let mut stack = [0u32; 8];
        initialize_stack(&mut stack, 0x100, 0, TaskMode::System);
    }

    #[quickcheck]
    fn registers_round_trip(regs: Registers, critical_nesting: u32) {
        let frame = ContextFrame::from_registers(&regs, critical_nesting);
        assert_eq!(frame.to_registers(), regs);

        let mut stack = [0u32; ContextFrame::WORDS];
        let top = stack.as_mut_ptr_range().end;
        let (popped, after) = unsafe { ContextFrame::pop(frame.push(top)) };
        assert_eq!(after, top as *const u32);
        assert_eq!(popped, frame);
    }
}
