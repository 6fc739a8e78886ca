use core::marker::PhantomData;
use core::time::Duration;

use bevy::asset::{AssetLoader, LoadContext, io::Reader};
use bevy::prelude::*;

use volition_core::actionset::ActionSet;

/// A (de)serialization backend for ActionSet manifests.
///
/// Implement this to support additional formats; the stock backends cover
/// JSON (`json_support`) and RON (`ron_support`).
pub trait ActionSetLoaderBackend: Send + Sync + 'static {
    /// What type the backend returns on a failed parse.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Must be able to load from a byte array.
    fn from_slice(v: &[u8]) -> core::result::Result<ActionSet, Self::Error>;

    /// What extensions should be read for this (by default)?
    fn extensions() -> &'static [&'static str] {
        &[]
    }
}

#[cfg(any(feature = "json_support", test))]
pub mod json_support {
    use super::{ActionSet, ActionSetLoaderBackend};

    #[derive(Default)]
    pub struct JsonActionSetLoader;

    impl ActionSetLoaderBackend for JsonActionSetLoader {
        type Error = serde_json::Error;

        fn from_slice(v: &[u8]) -> core::result::Result<ActionSet, Self::Error> {
            serde_json::from_slice(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["json"]
        }
    }
}

#[cfg(any(feature = "ron_support", test))]
pub mod ron_support {
    use super::{ActionSet, ActionSetLoaderBackend};

    #[derive(Default)]
    pub struct RonActionSetLoader;

    impl ActionSetLoaderBackend for RonActionSetLoader {
        type Error = ron::de::SpannedError;

        fn from_slice(v: &[u8]) -> core::result::Result<ActionSet, Self::Error> {
            ron::de::from_bytes(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["ron"]
        }
    }
}

// Asset loader
#[derive(Default)]
pub struct ActionSetLoader<B: ActionSetLoaderBackend>(PhantomData<B>);

// `AssetLoader` requires `TypePath`. Implemented by hand (rather than via
// `#[derive(TypePath)]`) so the blanket `B: TypePath` bound the derive would
// add is avoided — `B` only appears behind `PhantomData`.
impl<B: ActionSetLoaderBackend> TypePath for ActionSetLoader<B> {
    fn type_path() -> &'static str {
        "volition_actionset_loader::loader::ActionSetLoader<B>"
    }

    fn short_type_path() -> &'static str {
        "ActionSetLoader<B>"
    }

    fn type_ident() -> Option<&'static str> {
        Some("ActionSetLoader")
    }

    fn crate_name() -> Option<&'static str> {
        Some("volition_actionset_loader")
    }

    fn module_path() -> Option<&'static str> {
        Some("volition_actionset_loader::loader")
    }
}

impl<B: ActionSetLoaderBackend> AssetLoader for ActionSetLoader<B> {
    type Asset = ActionSet;
    type Settings = ();
    type Error = Box<dyn core::error::Error + Send + Sync + 'static>;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _ctx: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionSetLoader running...");
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes).await;
        let read = B::from_slice(&bytes);
        let res: Result<ActionSet, Self::Error> = read.map_err(|err| {
            #[cfg(feature = "logging")]
            bevy::log::error!("ActionSetLoader error: {:?}", err);
            err.into()
        });
        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionSetLoader finished...");
        res
    }

    fn extensions(&self) -> &[&str] {
        B::extensions()
    }
}

#[derive(Resource, Default)]
struct ActionSetHandles(pub std::collections::HashMap<String, Handle<ActionSet>>);

#[derive(Resource, Default)]
struct AssetLoadTimeouts(pub std::collections::HashMap<String, Timer>);

#[derive(Event, Debug)]
pub struct LoadActionSetRequest {
    filename: String,
}

impl LoadActionSetRequest {
    pub fn new<IS: Into<String>>(filename: IS) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

#[derive(Event, Debug)]
pub struct ActionSetLoaded {
    pub filename: String,
    pub asset_handle: Handle<ActionSet>,
}

#[derive(Event, Debug)]
pub struct ActionSetLoadingTimeout {
    pub filename: String,
    pub timeout_time: f32,
}

fn load_asset(
    event: On<LoadActionSetRequest>,
    asset_server: Res<AssetServer>,
    mut handles: ResMut<ActionSetHandles>,
    mut timer: ResMut<AssetLoadTimeouts>,
) {
    let asset_path = event.event().filename.to_owned();
    #[cfg(feature = "logging")]
    bevy::log::info!("Reading ActionSet from {}...", &asset_path);
    let handle: Handle<ActionSet> = asset_server.load(asset_path.to_owned());
    handles.0.entry(asset_path.to_owned()).or_insert(handle);
    timer.0.insert(
        asset_path.to_owned(),
        Timer::new(Duration::from_secs(2), TimerMode::Once),
    );
}

fn countdown(
    time: Res<Time>,
    handles: Res<ActionSetHandles>,
    assets: Res<Assets<ActionSet>>,
    mut timers: ResMut<AssetLoadTimeouts>,
    mut commands: Commands,
) {
    timers.0.iter_mut().for_each(|(key, timer)| {
        if timer.is_finished() {
            let handle = handles.0.get(key);
            let asset = handle.map(|handle| assets.get(handle)).flatten();

            match asset {
                Some(_loaded_data) => {
                    #[cfg(feature = "logging")]
                    bevy::log::info!("Successfully loaded ActionSet from file {:?}...", key);
                    let notification = ActionSetLoaded {
                        filename: key.to_owned(),
                        asset_handle: handle.unwrap().to_owned(),
                    };
                    commands.trigger(notification);
                }
                None => {
                    let elapsed_time = timer.elapsed_secs();
                    #[cfg(feature = "logging")]
                    bevy::log::warn!(
                        "Loading ActionSet data from file {:?} timed out after {:?}s!",
                        key,
                        elapsed_time
                    );
                    let notification = ActionSetLoadingTimeout {
                        filename: key.to_owned(),
                        timeout_time: elapsed_time,
                    };
                    commands.trigger(notification);
                }
            };
        } else {
            timer.tick(time.delta());
        }
    });
}

fn cleanup_timers_for_loaded_actionsets(
    event: On<ActionSetLoaded>,
    mut timers: ResMut<AssetLoadTimeouts>,
) {
    let evt = event.event();
    timers.0.remove(&evt.filename);
}

#[derive(Default)]
pub struct ActionSetAssetPlugin<B: ActionSetLoaderBackend>(PhantomData<B>);

impl<B: ActionSetLoaderBackend + Default> bevy::app::Plugin for ActionSetAssetPlugin<B> {
    fn build(&self, app: &mut bevy::app::App) {
        app.add_plugins(AssetPlugin::default())
            .init_resource::<ActionSetHandles>()
            .init_asset::<ActionSet>()
            .init_asset_loader::<ActionSetLoader<B>>()
            .init_resource::<AssetLoadTimeouts>()
            .add_observer(load_asset)
            .add_observer(cleanup_timers_for_loaded_actionsets)
            .add_systems(First, countdown);
    }
}

#[cfg(test)]
mod tests {
    use bevy::asset::io::AssetSourceBuilder;
    use bevy::{app::ScheduleRunnerPlugin, prelude::*};

    use super::json_support::JsonActionSetLoader;
    use super::ron_support::RonActionSetLoader;
    use super::*;

    #[derive(Resource, Debug)]
    struct TestAssetFilepath(String);

    fn load_test_asset(src_path_res: Res<TestAssetFilepath>, mut commands: Commands) {
        let request = LoadActionSetRequest {
            filename: src_path_res.0.to_owned(),
        };
        commands.trigger(request);
    }

    fn succeed_on_loaded(trigger: On<ActionSetLoaded>, mut exit: MessageWriter<AppExit>) {
        let _evt = trigger.event();
        #[cfg(feature = "logging")]
        bevy::log::info!(
            "ActionSet loaded successfully from {:?} as {:?}",
            _evt.filename,
            _evt.asset_handle
        );
        exit.write(AppExit::Success);
    }

    fn fail_on_timeout(trigger: On<ActionSetLoadingTimeout>, mut exit: MessageWriter<AppExit>) {
        let evt = trigger.event();
        assert!(
            false,
            "ActionSet loading from {:?} timed out after {:?}s",
            evt.filename, evt.timeout_time
        );
        exit.write(AppExit::Success);
    }

    /// An abstraction over the common bits of each format's test code.
    fn run_loader_test<B: ActionSetLoaderBackend + Default>(src_path: &str) {
        let asloader: ActionSetAssetPlugin<B> = Default::default();
        let mut app = App::new();
        app.register_asset_source(
            "test_assets",
            AssetSourceBuilder::platform_default("test_assets", None),
        )
        .insert_resource(TestAssetFilepath(src_path.to_string()))
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(200))),
            #[cfg(feature = "logging")]
            bevy::log::LogPlugin {
                level: bevy::log::Level::DEBUG,
                custom_layer: |_| None,
                filter: "wgpu=error,bevy_render=info,bevy_ecs=info".to_string(),
                fmt_layer: |_| None,
            },
            asloader,
        ))
        .add_systems(Startup, load_test_asset)
        .add_observer(succeed_on_loaded)
        .add_observer(fail_on_timeout)
        .run();
    }

    #[test]
    fn test_load_json() {
        run_loader_test::<JsonActionSetLoader>("test_assets://simpleagent.json");
    }

    #[test]
    fn test_load_ron() {
        run_loader_test::<RonActionSetLoader>("test_assets://simpleagent.ron");
    }

    #[test]
    fn test_json_roundtrip_defaults_weight() {
        let manifest = br#"{
            "name": "simpleagent",
            "entries": [
                {"kind": "Idle", "weight": 0.1},
                {"kind": "Wander"}
            ]
        }"#;

        let set = JsonActionSetLoader::from_slice(manifest).expect("valid manifest");
        assert_eq!(set.name, "simpleagent");
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries[1].kind, "Wander");
        assert_eq!(set.entries[1].weight, 1.);
    }
}
