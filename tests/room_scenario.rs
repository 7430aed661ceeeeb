// tests/room_scenario.rs - End-to-end room scenarios

use std::time::Duration;

use actix::prelude::*;
use fipa_room_agents::acl_message::{AgentId, Performative};
use fipa_room_agents::actor::{
    agent_status, shutdown_agents, start_role, ActorRegistry, ShutdownReason,
};
use fipa_room_agents::agent::Agent;
use fipa_room_agents::config::SimulationConfig;
use fipa_room_agents::platform::Platform;
use fipa_room_agents::protocol::NegotiationOutcome;
use fipa_room_agents::room::{
    AgentRole, BuildingEnvironment, DeviceController, EnvironmentHandle, Illuminance, RoomManager,
    Weather, RAISE_BLINDS, TURN_ON_LIGHT,
};
use fipa_room_agents::tools::SnifferFilter;

const STEP_MS: u64 = 10;

fn fast_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.manager.perception_delay_ms = 100;
    config.environment.notification_interval_ms = 200;
    config.discovery.retry_interval_ms = 50;
    config
}

/// The four agents stepped on a shared fake clock
struct Room {
    platform: Platform,
    agents: Vec<Agent>,
    env: EnvironmentHandle,
    manager: RoomManager,
    now_ms: u64,
}

impl Room {
    fn new(config: &SimulationConfig, with_devices: bool) -> Self {
        let platform = Platform::default();
        let environment = BuildingEnvironment::new(&config.environment);
        let manager = RoomManager::new(config);

        let mut agents = vec![
            platform
                .spawn_role(&config.environment.name, &environment)
                .unwrap(),
            platform.spawn_role(&config.manager.name, &manager).unwrap(),
        ];
        if with_devices {
            agents.push(
                platform
                    .spawn_role(&config.lamp.name, &DeviceController::lamp(config))
                    .unwrap(),
            );
            agents.push(
                platform
                    .spawn_role(&config.blinds.name, &DeviceController::blinds(config))
                    .unwrap(),
            );
        }

        Self {
            platform,
            agents,
            env: environment.handle(),
            manager,
            now_ms: 0,
        }
    }

    fn advance(&mut self, ms: u64) {
        let end = self.now_ms + ms;
        while self.now_ms < end {
            self.now_ms += STEP_MS;
            for _ in 0..3 {
                for agent in &mut self.agents {
                    agent.run_until_idle_at(self.now_ms, 64);
                }
            }
        }
    }

    fn outcomes(&self) -> Vec<NegotiationOutcome> {
        self.manager.outcomes().lock().clone()
    }

    fn sent(&self, performative: Performative) -> usize {
        self.platform
            .sniffer()
            .query(&SnifferFilter {
                performative: Some(performative),
                ..Default::default()
            })
            .len()
    }
}

fn completed(provider: &str, offer: &str) -> NegotiationOutcome {
    NegotiationOutcome::Completed {
        provider: AgentId::new(provider),
        offer: offer.to_string(),
    }
}

#[test]
fn cloudy_low_illuminance_turns_on_the_lamp() {
    let mut room = Room::new(&fast_config(), true);
    room.env.set_weather(Weather::Cloudy);

    room.advance(1000);
    assert!(room.outcomes().is_empty());
    assert_eq!(room.manager.perceived().weather, Some(Weather::Cloudy));
    assert_eq!(room.manager.perceived().illuminance, Some(Illuminance::High));

    room.env.set_illuminance(Illuminance::Low);
    room.advance(1000);

    assert_eq!(room.outcomes(), vec![completed("lamp-controller", TURN_ON_LIGHT)]);
    assert_eq!(room.env.illuminance(), Illuminance::High);
    assert_eq!(room.manager.perceived().illuminance, Some(Illuminance::High));
    assert_eq!(room.sent(Performative::Cfp), 1);
    assert_eq!(room.sent(Performative::AcceptProposal), 1);
}

#[test]
fn sunny_low_illuminance_raises_the_blinds() {
    let mut room = Room::new(&fast_config(), true);
    room.advance(1000);

    room.env.set_illuminance(Illuminance::Low);
    room.advance(1000);

    assert_eq!(room.outcomes(), vec![completed("blinds-controller", RAISE_BLINDS)]);
    assert_eq!(room.env.illuminance(), Illuminance::High);
}

#[test]
fn every_drop_into_low_starts_one_round() {
    let mut room = Room::new(&fast_config(), true);
    room.env.set_weather(Weather::Cloudy);
    room.advance(1000);

    room.env.set_illuminance(Illuminance::Low);
    room.advance(1000);
    assert_eq!(room.outcomes().len(), 1);

    room.env.set_weather(Weather::Sunny);
    room.env.set_illuminance(Illuminance::Low);
    room.advance(1000);

    assert_eq!(
        room.outcomes(),
        vec![
            completed("lamp-controller", TURN_ON_LIGHT),
            completed("blinds-controller", RAISE_BLINDS),
        ]
    );
    assert_eq!(room.sent(Performative::Cfp), 2);
}

#[test]
fn sustained_low_without_devices_negotiates_once() {
    let mut room = Room::new(&fast_config(), false);
    room.advance(500);

    room.env.set_illuminance(Illuminance::Low);
    room.advance(2000);

    assert_eq!(room.outcomes(), vec![NegotiationOutcome::NoProviders]);
    assert_eq!(room.env.illuminance(), Illuminance::Low);
    assert_eq!(room.sent(Performative::Cfp), 0);
    assert!(room.sent(Performative::Inform) > 5);
}

#[test]
fn notifications_follow_the_interval() {
    let mut room = Room::new(&fast_config(), false);
    room.advance(1000);

    // Two topics, first notification at subscription time
    let informs = room.sent(Performative::Inform);
    assert!((8..=10).contains(&informs), "informs = {informs}");
    assert_eq!(room.sent(Performative::Agree), 2);
}

#[actix_rt::test]
async fn actors_negotiate_in_real_time() {
    let mut config = fast_config();
    config.scheduler.tick_ms = 5;
    config.manager.perception_delay_ms = 50;
    config.environment.notification_interval_ms = 50;
    config.discovery.retry_interval_ms = 20;

    let platform = Platform::default();
    let registry = ActorRegistry::new().start();

    let environment = BuildingEnvironment::new(&config.environment);
    let manager = RoomManager::new(&config);
    let lamp = DeviceController::lamp(&config);
    let blinds = DeviceController::blinds(&config);
    let env = environment.handle();
    env.set_weather(Weather::Cloudy);

    let roles: [(&str, &dyn AgentRole); 4] = [
        (config.environment.name.as_str(), &environment),
        (config.manager.name.as_str(), &manager),
        (config.lamp.name.as_str(), &lamp),
        (config.blinds.name.as_str(), &blinds),
    ];
    let tick = Duration::from_millis(config.scheduler.tick_ms);
    for (name, role) in roles {
        start_role(&platform, &registry, name, role, tick, 64).unwrap();
    }

    actix_rt::time::sleep(Duration::from_millis(300)).await;
    env.set_illuminance(Illuminance::Low);

    let outcomes = manager.outcomes();
    for _ in 0..200 {
        if !outcomes.lock().is_empty() && env.illuminance() == Illuminance::High {
            break;
        }
        actix_rt::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(
        outcomes.lock().first().cloned(),
        Some(completed("lamp-controller", TURN_ON_LIGHT))
    );
    assert_eq!(env.illuminance(), Illuminance::High);

    let status = agent_status(&registry, "lamp-controller").await.unwrap();
    assert_eq!(status.role, lamp.role());

    let stopped = shutdown_agents(&registry, ShutdownReason::PlatformShutdown)
        .await
        .unwrap();
    assert_eq!(stopped, 4);
}
