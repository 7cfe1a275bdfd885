//! Record/playback controller: samples a button into RAM and replays it on
//! the LEDs.

use tock_ir::{AccessError, Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports, SignalRef};

use crate::fsm::{StateEnum, UnknownStatePolicy};
use crate::invalid;
use crate::ram::Ram;
use crate::reset::{ResetGen, SampleEnable};

/// Controller states, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Idle after reset; button A arms recording.
    Init,
    /// Armed; releasing button A starts recording.
    WaitingToRecord,
    /// Storing one sample of button B per sample pulse.
    Recording,
    /// Recording done; releasing button A starts playback.
    WaitingToPlay,
    /// Looping over the recorded samples.
    Playing,
}

impl StateEnum for RecordState {
    const ALL: &'static [Self] = &[
        Self::Init,
        Self::WaitingToRecord,
        Self::Recording,
        Self::WaitingToPlay,
        Self::Playing,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::WaitingToRecord => "WAITING_TO_RECORD",
            Self::Recording => "RECORDING",
            Self::WaitingToPlay => "WAITING_TO_PLAY",
            Self::Playing => "PLAYING",
        }
    }
}

const LEDS_INIT: u64 = 0b10101;
const LEDS_WAITING_TO_RECORD: u64 = 0b11010;
const LEDS_WAITING_TO_PLAY: u64 = 0b10000;

/// LED pattern echoing one sample: the top LED plus four copies of the bit.
fn echo(sample: u64) -> u64 {
    0b10000 | if sample & 1 != 0 { 0b1111 } else { 0 }
}

/// Records button B into a 1-bit RAM while button A is released, then plays
/// the recording back on `leds_o` in a loop.
///
/// The controller acts only on clocks where the [`SampleEnable`] pulse is
/// high; a [`ResetGen`] pulse returns it to `INIT`. RAM writes are
/// registered, so each sample lands one clock after the controller
/// schedules it, and `data_o` only follows the RAM on clocks without a
/// write.
#[derive(Debug, Clone, Copy)]
pub struct RecordPlay {
    /// RAM address width; up to `2^addr_width` samples are kept.
    pub addr_width: u32,
    /// Sample-enable rollover; one sample every `rollover + 1` clocks.
    pub rollover: u64,
    /// Length of the power-on reset in edges.
    pub reset_edges: u64,
    /// Behavior on an undeclared controller state.
    pub policy: UnknownStatePolicy,
}

impl Default for RecordPlay {
    /// 2048 samples at 100 Hz from a 12 MHz clock.
    fn default() -> Self {
        Self {
            addr_width: 11,
            rollover: 119_999,
            reset_edges: 1,
            policy: UnknownStatePolicy::Recover,
        }
    }
}

impl Chunk for RecordPlay {
    fn kind(&self) -> &str {
        "record_play"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("button_a_i", 1),
            PortSpec::input("button_b_i", 1),
            PortSpec::output("leds_o", 5),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.addr_width == 0 {
            return Err(invalid("record_play", "address width must be at least 1"));
        }
        let clk = io.clock("clk_i")?;
        let (button_a, button_b) = (io.get("button_a_i")?, io.get("button_b_i")?);
        let leds = io.get("leds_o")?;

        let reset = b.wire("reset")?;
        b.instantiate(
            "reset_gen",
            &ResetGen {
                edges: self.reset_edges,
            },
            &[("clk_i", clk.into()), ("reset_o", reset.into())],
        )?;
        let do_sample = b.wire("do_sample")?;
        b.instantiate(
            "sample_en",
            &SampleEnable {
                rollover: self.rollover,
            },
            &[("clk_i", clk.into()), ("sample_o", do_sample.into())],
        )?;

        let wr = b.wire("wr")?;
        let addr = b.bus("addr", self.addr_width)?;
        let end_addr = b.bus("end_addr", self.addr_width)?;
        let data_i = b.bus("data_i", 1)?;
        let data_o = b.bus("data_o", 1)?;
        b.instantiate(
            "ram",
            &Ram {
                addr_width: self.addr_width,
                data_width: 1,
                enable: false,
            },
            &[
                ("clk_i", clk.into()),
                ("wr_i", wr.into()),
                ("addr_i", addr.into()),
                ("data_i", data_i.into()),
                ("data_o", data_o.into()),
            ],
        )?;

        let names: Vec<&str> = RecordState::ALL.iter().map(|s| s.name()).collect();
        let state = b.state_signal("state", &names, RecordState::Init.index())?;

        let reads: Vec<SignalRef> = vec![
            reset.into(),
            do_sample.into(),
            state.into(),
            button_a.clone(),
            button_b.clone(),
            addr.into(),
            end_addr.into(),
            data_o.into(),
        ];
        let drives: Vec<SignalRef> = vec![
            wr.into(),
            state.into(),
            leds.clone(),
            addr.into(),
            end_addr.into(),
            data_i.into(),
        ];
        let policy = self.policy;
        let label = io.instance().to_string();
        b.seq("fsm", clk, Edge::Rising)
            .reads(reads)
            .drives(drives)
            .body(move |ctx| {
                use RecordState::*;

                ctx.set(wr, 0)?;
                if ctx.is_high(reset)? {
                    return ctx.set(state, Init.index() as u64);
                }
                if !ctx.is_high(do_sample)? {
                    return Ok(());
                }
                let a_pressed = ctx.is_high(&button_a)?;
                let sample = ctx.get(&button_b)?;
                let current = ctx.get(state)?;
                let Some(s) = RecordState::from_index(current) else {
                    if policy == UnknownStatePolicy::Fail {
                        return Err(AccessError::UnknownState {
                            signal: state,
                            value: current,
                        });
                    }
                    tracing::warn!(controller = %label, value = current, "undeclared state, returning to INIT");
                    return ctx.set(state, Init.index() as u64);
                };

                let next = match s {
                    Init => {
                        ctx.set(&leds, LEDS_INIT)?;
                        if a_pressed { WaitingToRecord } else { Init }
                    }
                    WaitingToRecord => {
                        ctx.set(&leds, LEDS_WAITING_TO_RECORD)?;
                        if a_pressed {
                            WaitingToRecord
                        } else {
                            ctx.set(addr, 0)?;
                            ctx.set(data_i, sample)?;
                            ctx.set(wr, 1)?;
                            Recording
                        }
                    }
                    Recording => {
                        let next_addr = ctx.get(addr)?.wrapping_add(1);
                        ctx.set(addr, next_addr)?;
                        ctx.set(data_i, sample)?;
                        ctx.set(wr, 1)?;
                        ctx.set(&leds, echo(sample))?;
                        if a_pressed {
                            ctx.set(end_addr, next_addr)?;
                            WaitingToPlay
                        } else {
                            Recording
                        }
                    }
                    WaitingToPlay => {
                        ctx.set(&leds, LEDS_WAITING_TO_PLAY)?;
                        if a_pressed {
                            WaitingToPlay
                        } else {
                            ctx.set(addr, 0)?;
                            Playing
                        }
                    }
                    Playing => {
                        let played = ctx.get(data_o)?;
                        ctx.set(&leds, echo(played))?;
                        let at = ctx.get(addr)?;
                        let wrapped = if at == ctx.get(end_addr)? { 0 } else { at.wrapping_add(1) };
                        ctx.set(addr, wrapped)?;
                        if a_pressed { WaitingToRecord } else { Playing }
                    }
                };
                ctx.set(state, next.index() as u64)
            })?;
        Ok(())
    }
}
