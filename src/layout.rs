//! Main layout: sidebar state and the menu it drives.

use std::cell::Cell;

use anyhow::Result;
use serde::Serialize;

use crate::{
    auth::{self, SessionStore},
    navigation::{Navigator, Route},
};

/// Sidebar visibility, owned by the main layout and lent to its children.
#[derive(Debug, Default)]
pub struct SidebarContext {
    open: Cell<bool>,
}

impl SidebarContext {
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn toggle(&self) {
        self.open.set(!self.open.get());
    }

    pub fn close(&self) {
        self.open.set(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub title: &'static str,
    pub icon: &'static str,
    pub route: Route,
}

pub const MENU_ITEMS: [MenuItem; 7] = [
    MenuItem {
        title: "Dashboard",
        icon: "home-outline",
        route: Route::Dashboard,
    },
    MenuItem {
        title: "Create Farm",
        icon: "leaf-outline",
        route: Route::CreateFarm,
    },
    MenuItem {
        title: "Get Recommendations",
        icon: "bulb-outline",
        route: Route::SoilDetection,
    },
    MenuItem {
        title: "Weather",
        icon: "partly-sunny-outline",
        route: Route::Weather,
    },
    MenuItem {
        title: "Analytics",
        icon: "analytics-outline",
        route: Route::Analytics,
    },
    MenuItem {
        title: "Community",
        icon: "people-outline",
        route: Route::Community,
    },
    MenuItem {
        title: "Settings",
        icon: "settings-outline",
        route: Route::Settings,
    },
];

pub struct MainLayout<'a> {
    sidebar: SidebarContext,
    navigator: &'a dyn Navigator,
    store: &'a dyn SessionStore,
}

impl<'a> MainLayout<'a> {
    pub fn new(navigator: &'a dyn Navigator, store: &'a dyn SessionStore) -> Self {
        Self {
            sidebar: SidebarContext::default(),
            navigator,
            store,
        }
    }

    pub fn sidebar(&self) -> &SidebarContext {
        &self.sidebar
    }

    pub fn menu(&self) -> &'static [MenuItem] {
        &MENU_ITEMS
    }

    /// Navigate to a menu entry and dismiss the sidebar.
    pub fn select(&self, item: &MenuItem) {
        self.navigator.push(item.route);
        self.sidebar.close();
    }

    /// Clear the stored session and return to the welcome screen.
    pub async fn logout(&self) -> Result<()> {
        auth::logout(self.store).await?;
        self.sidebar.close();
        self.navigator.replace(Route::Welcome);
        Ok(())
    }
}
