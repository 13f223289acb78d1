use std::sync::{Mutex, MutexGuard, PoisonError};

use log::info;

use crate::error::Result;
use crate::frame::{ChecksumPolicy, Direction, build_power_frame, build_speed_frame};
use crate::link::HalfDuplex;
use crate::status::{StatusCheck, StatusFrame};
use crate::transport::{Delay, DirectionLine, Transport};

struct Inner<T, L, D> {
    link: HalfDuplex<T, L, D>,
    on: bool,
    last_rpm: Option<u32>,
}

/// Front end for one A131 drive.
///
/// The bus and the spindle state sit behind one mutex, held for a whole
/// transmit or receive sequence, so the controller can be shared between
/// threads without two sequences interleaving on the wire.
pub struct SpindleController<T, L, D> {
    inner: Mutex<Inner<T, L, D>>,
    policy: ChecksumPolicy,
    check: StatusCheck,
}

impl<T: Transport, L: DirectionLine, D: Delay> SpindleController<T, L, D> {
    /// Starts in the off state; nothing is sent.
    pub fn new(link: HalfDuplex<T, L, D>, policy: ChecksumPolicy, check: StatusCheck) -> Self {
        SpindleController {
            inner: Mutex::new(Inner {
                link,
                on: false,
                last_rpm: None,
            }),
            policy,
            check,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, L, D>> {
        // state stays consistent across a panic: flags only change after a send succeeds
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn turn_on(&self) -> Result<()> {
        let mut inner = self.lock();
        inner
            .link
            .send(&build_power_frame(Direction::Clockwise, self.policy))?;
        inner.on = true;
        Ok(())
    }

    pub fn turn_off(&self) -> Result<()> {
        let mut inner = self.lock();
        inner
            .link
            .send(&build_power_frame(Direction::Off, self.policy))?;
        inner.on = false;
        Ok(())
    }

    /// Sent whether or not the spindle runs; the drive decides what to do with it.
    pub fn set_speed(&self, target_rpm: u32) -> Result<()> {
        let mut inner = self.lock();
        inner
            .link
            .send(&build_speed_frame(target_rpm, self.policy))?;
        inner.last_rpm = Some(target_rpm);
        Ok(())
    }

    /// Next status frame broadcast by the drive.
    pub fn read_status(&self) -> Result<StatusFrame> {
        self.lock().link.read_status(self.check)
    }

    pub fn report_speed(&self) -> Result<u32> {
        let rpm = self.read_status()?.rpm();
        info!("current spindle speed: {rpm} rpm");
        Ok(rpm)
    }

    pub fn is_on(&self) -> bool {
        self.lock().on
    }

    pub fn last_commanded_rpm(&self) -> Option<u32> {
        self.lock().last_rpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::link::Timing;
    use crate::transport::mock::{Event, Log, MockBus, MockDelay, MockLine, bench};
    use std::sync::Arc;

    fn controller_with(
        bus: MockBus,
        line: MockLine,
        delay: MockDelay,
    ) -> SpindleController<MockBus, MockLine, MockDelay> {
        SpindleController::new(
            HalfDuplex::new(bus, line, delay, Timing::default()),
            ChecksumPolicy::Fresh,
            StatusCheck::Strict,
        )
    }

    fn writes(log: &Log) -> Vec<Vec<u8>> {
        log.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn starts_off_and_silent() {
        let (bus, line, delay, log) = bench();
        let spindle = controller_with(bus, line, delay);
        assert!(!spindle.is_on());
        assert_eq!(spindle.last_commanded_rpm(), None);
        assert!(log.events().is_empty());
    }

    #[test]
    fn on_off_cycle_updates_state_and_wire() {
        let (bus, line, delay, log) = bench();
        let spindle = controller_with(bus, line, delay);

        spindle.turn_on().unwrap();
        assert!(spindle.is_on());
        spindle.turn_off().unwrap();
        assert!(!spindle.is_on());

        assert_eq!(
            writes(&log),
            vec![
                vec![0x00, 0x55, 0x00, 0x00, 0x00, 0x01, 0x54, 0xAA, 0xFF],
                vec![0x00, 0x55, 0x00, 0x00, 0x01, 0x01, 0x55, 0xAC, 0xFF],
            ]
        );
    }

    #[test]
    fn speed_is_sent_in_either_state() {
        let (bus, line, delay, log) = bench();
        let spindle = controller_with(bus, line, delay);

        spindle.set_speed(3000).unwrap();
        assert!(!spindle.is_on());
        assert_eq!(spindle.last_commanded_rpm(), Some(3000));

        spindle.turn_on().unwrap();
        spindle.set_speed(6000).unwrap();
        assert!(spindle.is_on());

        let sent = writes(&log);
        assert_eq!(sent.len(), 3);
        assert_eq!(&sent[0][3..5], &[0x13, 0x88]);
        assert_eq!(&sent[2][3..5], &[0x27, 0x10]);
    }

    #[test]
    fn failed_transmission_keeps_state() {
        let (mut bus, line, delay, _log) = bench();
        bus.fail_writes = true;
        let spindle = controller_with(bus, line, delay);

        assert!(matches!(spindle.turn_on(), Err(Error::Transport(_))));
        assert!(!spindle.is_on());
        assert!(matches!(spindle.set_speed(1200), Err(Error::Transport(_))));
        assert_eq!(spindle.last_commanded_rpm(), None);
    }

    #[test]
    fn report_speed_decodes_broadcast() {
        let (mut bus, line, delay, log) = bench();
        bus.buffered.extend([0x55, 0x00, 0xFF]);
        bus.arriving
            .extend(StatusFrame::encode([1, 0, 0, 0, 0], 0x22).as_bytes());
        let spindle = controller_with(bus, line, delay);

        assert_eq!(spindle.report_speed().unwrap(), 60);
        assert!(writes(&log).is_empty());
        assert!(!spindle.is_on());
    }

    #[test]
    fn report_speed_without_drive_times_out() {
        let (bus, line, delay, _log) = bench();
        let spindle = controller_with(bus, line, delay);
        assert!(matches!(
            spindle.report_speed(),
            Err(Error::ResponseTimeout { received: 0, .. })
        ));
    }

    #[test]
    fn concurrent_commands_do_not_interleave() {
        let (bus, line, delay, log) = bench();
        let spindle = Arc::new(controller_with(bus, line, delay));

        let handles: Vec<_> = (1..=4u32)
            .map(|n| {
                let spindle = Arc::clone(&spindle);
                std::thread::spawn(move || spindle.set_speed(n * 600).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = log.events();
        assert_eq!(events.len(), 4 * 6);
        for sequence in events.chunks(6) {
            assert_eq!(sequence[0], Event::Assert);
            assert_eq!(sequence[1], Event::Delay(1));
            assert!(matches!(sequence[2], Event::Write(_)));
            assert_eq!(sequence[3], Event::Delay(10));
            assert_eq!(sequence[4], Event::Deassert);
            assert_eq!(sequence[5], Event::Delay(50));
        }
    }
}
