use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use radar_core::error::RadarError;
use radar_core::mocks::{FixedPrompt, ScriptedSensor, SpyActuator};
use radar_core::{Activation, ActivationGate, Controller, NetworkCfg, StopReason, SweepCfg};
use radar_traits::clock::test_clock::TestClock;
use rstest::rstest;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("ephemeral port")
        .port()
}

fn network(port: u16, accept_ms: u64) -> NetworkCfg {
    NetworkCfg {
        host: "127.0.0.1".into(),
        port,
        accept_timeout: Duration::from_millis(accept_ms),
        write_timeout: Duration::from_secs(5),
    }
}

fn stalling_network(port: u16, write_ms: u64) -> NetworkCfg {
    NetworkCfg {
        write_timeout: Duration::from_millis(write_ms),
        ..network(port, 5_000)
    }
}

fn connect_with_retry(port: u16) -> TcpStream {
    for _ in 0..200 {
        if let Ok(s) = TcpStream::connect(("127.0.0.1", port)) {
            return s;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("controller never started listening on {port}");
}

fn sweep() -> SweepCfg {
    SweepCfg {
        step_deg: 5,
        settle: Duration::from_millis(50),
        alert_distance_cm: 40.0,
    }
}

#[rstest]
fn streams_samples_until_interrupted() {
    let port = free_port();
    let actuator = SpyActuator::new();
    let spy = actuator.clone();
    let sensor = ScriptedSensor::constant(25.0);
    let releases = sensor.releases();
    let shutdown = Arc::new(AtomicBool::new(false));

    let controller = Controller::builder()
        .with_hardware(move || Ok((sensor, actuator)))
        .with_clock(TestClock::new())
        .with_sweep(sweep())
        .with_network(network(port, 5_000))
        .build()
        .expect("build");

    let flag = shutdown.clone();
    let consumer = thread::spawn(move || {
        let mut reader = BufReader::new(connect_with_retry(port));
        let mut lines = Vec::new();
        let mut line = String::new();
        while lines.len() < 10 {
            line.clear();
            reader.read_line(&mut line).expect("read");
            lines.push(line.clone());
        }
        flag.store(true, Ordering::Relaxed);
        // drain until the controller hangs up
        while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
            line.clear();
        }
        lines
    });

    let summary = controller.run(shutdown).expect("run");
    let lines = consumer.join().expect("consumer thread");

    assert_eq!(lines[0], "0,25.00\n");
    assert_eq!(lines[1], "5,25.00\n");
    assert_eq!(summary.activation, Activation::Disabled);
    assert_eq!(summary.stop, StopReason::Interrupted);
    assert!(summary.samples_sent >= 10);
    assert_eq!(summary.alerts, summary.samples_sent);
    assert!(summary.teardown.is_clean(), "{:?}", summary.teardown);
    assert_eq!(spy.detach_count(), 1);
    assert_eq!(releases.load(Ordering::Relaxed), 1);
}

#[rstest]
fn peer_disconnect_ends_run_and_tears_down() {
    let port = free_port();
    let actuator = SpyActuator::new();
    let spy = actuator.clone();
    let sensor = ScriptedSensor::constant(80.0);
    let releases = sensor.releases();

    let controller = Controller::builder()
        .with_hardware(move || Ok((sensor, actuator)))
        .with_clock(TestClock::new())
        .with_sweep(sweep())
        .with_network(network(port, 5_000))
        .build()
        .expect("build");

    let consumer = thread::spawn(move || {
        let mut reader = BufReader::new(connect_with_retry(port));
        let mut line = String::new();
        for _ in 0..3 {
            reader.read_line(&mut line).expect("read");
        }
    });

    let err = controller
        .run(Arc::new(AtomicBool::new(false)))
        .expect_err("peer went away");
    consumer.join().expect("consumer thread");

    assert_eq!(
        err.downcast_ref::<RadarError>(),
        Some(&RadarError::PeerDisconnected)
    );
    assert_eq!(spy.detach_count(), 1);
    assert_eq!(releases.load(Ordering::Relaxed), 1);
}

#[rstest]
fn wrong_secret_denies_without_building_hardware() {
    let built = Arc::new(AtomicBool::new(false));
    let built_flag = built.clone();
    let prompt = FixedPrompt::new("wrong");
    let asked = prompt.asked();

    let controller = Controller::builder()
        .with_hardware(move || {
            built_flag.store(true, Ordering::Relaxed);
            Ok((ScriptedSensor::constant(1.0), SpyActuator::new()))
        })
        .with_activation_gate(ActivationGate::new(true, Some("X123".into())))
        .with_prompt(prompt)
        .with_network(network(free_port(), 50))
        .build()
        .expect("build");

    let err = controller
        .run(Arc::new(AtomicBool::new(false)))
        .expect_err("denied");

    assert_eq!(
        err.downcast_ref::<RadarError>(),
        Some(&RadarError::ActivationDenied)
    );
    assert_eq!(asked.load(Ordering::Relaxed), 1);
    assert!(!built.load(Ordering::Relaxed));
}

#[rstest]
#[case(ActivationGate::new(true, Some("X123".into())), Some("X123\n"), Activation::Granted)]
#[case(ActivationGate::new(true, None), None, Activation::FailOpen)]
#[case(ActivationGate::disabled(), None, Activation::Disabled)]
fn activation_outcomes(
    #[case] gate: ActivationGate,
    #[case] answer: Option<&'static str>,
    #[case] expected: Activation,
) {
    let mut builder = Controller::builder()
        .with_hardware(|| Ok((ScriptedSensor::constant(1.0), SpyActuator::new())))
        .with_activation_gate(gate)
        .with_network(network(free_port(), 5_000));
    if let Some(answer) = answer {
        builder = builder.with_prompt(FixedPrompt::new(answer));
    }

    // raised before start: the accept wait returns immediately
    let summary = builder
        .build()
        .expect("build")
        .run(Arc::new(AtomicBool::new(true)))
        .expect("run");

    assert_eq!(summary.activation, expected);
    assert_eq!(summary.samples_sent, 0);
    assert_eq!(summary.stop, StopReason::Interrupted);
}

#[rstest]
fn accept_timeout_still_tears_down() {
    let actuator = SpyActuator::new();
    let spy = actuator.clone();
    let sensor = ScriptedSensor::constant(1.0);
    let releases = sensor.releases();

    let err = Controller::builder()
        .with_hardware(move || Ok((sensor, actuator)))
        .with_network(network(free_port(), 50))
        .build()
        .expect("build")
        .run(Arc::new(AtomicBool::new(false)))
        .expect_err("nobody connects");

    assert_eq!(
        err.downcast_ref::<RadarError>(),
        Some(&RadarError::AcceptTimeout { timeout_ms: 50 })
    );
    assert_eq!(spy.detach_count(), 1);
    assert_eq!(releases.load(Ordering::Relaxed), 1);
    assert!(spy.angles().is_empty());
}

#[rstest]
fn hardware_factory_error_is_returned() {
    let err = Controller::builder()
        .with_hardware(|| -> radar_core::Result<(ScriptedSensor, SpyActuator)> {
            Err(radar_core::Report::new(RadarError::Hardware("gpio busy".into())))
        })
        .with_network(network(free_port(), 50))
        .build()
        .expect("build")
        .run(Arc::new(AtomicBool::new(false)))
        .expect_err("factory failed");
    assert!(matches!(
        err.downcast_ref::<RadarError>(),
        Some(RadarError::Hardware(_))
    ));
}

#[rstest]
fn stalled_consumer_hits_write_timeout_and_tears_down() {
    let port = free_port();
    let actuator = SpyActuator::new();
    let spy = actuator.clone();
    let sensor = ScriptedSensor::constant(55.0);
    let releases = sensor.releases();

    let controller = Controller::builder()
        .with_hardware(move || Ok((sensor, actuator)))
        .with_clock(TestClock::new())
        .with_sweep(sweep())
        .with_network(stalling_network(port, 100))
        .build()
        .expect("build");

    // connects, never reads, keeps the socket open until told to let go
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let consumer = thread::spawn(move || {
        let stream = connect_with_retry(port);
        let _ = done_rx.recv();
        drop(stream);
    });

    let err = controller
        .run(Arc::new(AtomicBool::new(false)))
        .expect_err("consumer stalled");
    done_tx.send(()).expect("release consumer");
    consumer.join().expect("consumer thread");

    assert_eq!(
        err.downcast_ref::<RadarError>(),
        Some(&RadarError::WriteTimeout { timeout_ms: 100 })
    );
    assert_eq!(spy.detach_count(), 1);
    assert_eq!(releases.load(Ordering::Relaxed), 1);
}

#[rstest]
fn activation_happens_before_hardware_is_armed() {
    let built = Arc::new(AtomicBool::new(false));
    let built_flag = built.clone();

    let armed = Controller::builder()
        .with_hardware(move || {
            built_flag.store(true, Ordering::Relaxed);
            Ok((ScriptedSensor::constant(1.0), SpyActuator::new()))
        })
        .with_activation_gate(ActivationGate::new(true, Some("X123".into())))
        .with_prompt(FixedPrompt::new("X123"))
        .with_network(network(free_port(), 5_000))
        .build()
        .expect("build")
        .activate()
        .expect("secret accepted");

    assert_eq!(armed.activation(), Activation::Granted);
    assert!(!built.load(Ordering::Relaxed));

    let summary = armed.run(Arc::new(AtomicBool::new(true))).expect("run");
    assert!(built.load(Ordering::Relaxed));
    assert_eq!(summary.activation, Activation::Granted);
    assert_eq!(summary.stop, StopReason::Interrupted);
}
