pub mod battle;
pub mod constants;
pub mod events;
pub mod integrator;
pub mod render;
pub mod state;
pub mod swarm;
pub mod systems;
