/// `Record` for local structs with a flattened `meta: ResourceMeta`
macro_rules! impl_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl cloudsync::Record for $ty {
                fn meta(&self) -> &cloudsync::ResourceMeta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut cloudsync::ResourceMeta {
                    &mut self.meta
                }
            }
        )+
    };
}

/// `RemoteRecord` for remote structs with a flattened `meta: RemoteMeta`
macro_rules! impl_remote_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl cloudsync::RemoteRecord for $ty {
                fn remote_meta(&self) -> &cloudsync::RemoteMeta {
                    &self.meta
                }
            }
        )+
    };
}

/// Match local and remote records on the provider global id
macro_rules! impl_external_key {
    ($local:ty, $remote:ty) => {
        impl cloudsync::SyncKey for $local {
            fn sync_key(&self, _scope: &cloudsync::Scope) -> String {
                self.meta.external_id.clone()
            }
        }

        impl cloudsync::SyncKey for $remote {
            fn sync_key(&self, _scope: &cloudsync::Scope) -> String {
                self.meta.global_id.clone()
            }
        }
    };
}

pub(crate) use impl_external_key;
pub(crate) use impl_record;
pub(crate) use impl_remote_record;
